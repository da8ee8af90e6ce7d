use facelabel::difference::AnnotationDifference;
use facelabel::model::{Absolute, AnnotationTree, Coord, Feature, Rect, Relative};
use proptest::prelude::*;

mod proptest_helpers;

fn frame_and_root() -> impl Strategy<Value = ((f64, f64), Rect<Relative>)> {
    (100i64..600, 100i64..600).prop_flat_map(|(fw, fh)| {
        (
            Just((fw as f64, fh as f64)),
            (0..fw - 30, 0..fh - 30, 20i64..200, 20i64..200)
                .prop_map(|(x, y, w, h)| Rect::new(x as f64, y as f64, w as f64, h as f64)),
        )
    })
}

fn loose_children() -> impl Strategy<Value = Vec<Rect<Relative>>> {
    proptest::collection::vec(
        (-50i64..250, -50i64..250, 1i64..80, 1i64..80)
            .prop_map(|(x, y, w, h)| Rect::new(x as f64, y as f64, w as f64, h as f64)),
        0..5,
    )
}

fn faces() -> impl Strategy<Value = Vec<Rect<Relative>>> {
    proptest::collection::vec(
        (0i64..200, 0i64..200, 20i64..120, 20i64..120)
            .prop_map(|(x, y, w, h)| Rect::new(x as f64, y as f64, w as f64, h as f64)),
        0..5,
    )
}

fn tree_of(rects: &[Rect<Relative>]) -> AnnotationTree {
    let mut tree = AnnotationTree::new();
    for rect in rects {
        tree.insert(Feature::Face, *rect, None).expect("insert root");
    }
    tree
}

proptest! {
    #![proptest_config(proptest_helpers::proptest_config())]

    #[test]
    fn extend_and_clip_leaves_every_region_inside_its_container(
        ((fw, fh), root_rect) in frame_and_root(),
        children in loose_children(),
    ) {
        let mut tree = AnnotationTree::new();
        let root = tree.insert(Feature::Face, root_rect, None).expect("insert root");
        for child in &children {
            tree.insert(Feature::Nose, *child, Some(root)).expect("insert child");
        }
        let frame: Rect<Absolute> = Rect::new(0.0, 0.0, fw, fh);

        tree.extend_and_clip(root, &frame).expect("extend and clip");

        let root_node = tree.get(root).expect("root survives");
        prop_assert!(root_node.fits_in(&frame), "root {:?} outside {:?}", root_node.rect(), frame);
        for id in tree.descendants(root).into_iter().skip(1) {
            let node = tree.get(id).expect("attached child");
            let parent = tree.get(node.parent().expect("child has a parent")).expect("parent");
            prop_assert!(node.fits_in(parent.rect()));
        }
    }

    #[test]
    fn contains_follows_the_feature_shape(
        feature in proptest::sample::select(Feature::ALL.to_vec()),
        (x, y, w, h) in (0i64..100, 0i64..100, 1i64..100, 1i64..100),
        (px, py) in (-10.0f64..210.0, -10.0f64..210.0),
    ) {
        let rect: Rect<Relative> = Rect::new(x as f64, y as f64, w as f64, h as f64);
        let mut tree = AnnotationTree::new();
        let id = tree.insert(feature, rect, None).expect("insert root");
        let node = tree.get(id).expect("inserted");
        let p = Coord::<Absolute>::new(px, py);
        let expected = if feature.is_rectangle() {
            node.rect().contains_point(&p)
        } else {
            node.rect().ellipse_contains_point(&p)
        };
        prop_assert_eq!(node.contains_point(&p), expected);
    }

    #[test]
    fn raising_the_threshold_never_adds_matches(
        baseline in faces(),
        candidate in faces(),
        (a, b) in (0.0f64..=1.0, 0.0f64..=1.0),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let x = tree_of(&baseline);
        let y = tree_of(&candidate);
        let loose = AnnotationDifference::compute(&x, &y, low);
        let strict = AnnotationDifference::compute(&x, &y, high);

        prop_assert!(strict.true_positives.len() <= loose.true_positives.len());
        prop_assert!(
            strict.false_positives.len() + strict.false_negatives.len()
                >= loose.false_positives.len() + loose.false_negatives.len()
        );
    }
}
