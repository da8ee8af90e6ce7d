use facelabel::difference::AnnotationDifference;
use facelabel::model::{AnnotationTree, AttributeKind, Coord, Feature, Rect, Relative};

fn faces(rects: &[(f64, f64, f64, f64)]) -> AnnotationTree {
    let mut tree = AnnotationTree::new();
    for &(x, y, w, h) in rects {
        let rect: Rect<Relative> = Rect::new(x, y, w, h);
        tree.insert(Feature::Face, rect, None).unwrap();
    }
    tree
}

#[test]
fn shifted_face_scores_by_overlap() {
    let x = faces(&[(0.0, 0.0, 100.0, 100.0)]);
    let y = faces(&[(10.0, 10.0, 100.0, 100.0)]);

    let diff = AnnotationDifference::compute(&x, &y, 0.5);
    assert_eq!(diff.true_positives.len(), 1);
    assert_eq!(diff.false_positives.len(), 0);
    assert_eq!(diff.false_negatives.len(), 0);
    assert!((diff.scores[0] - 8100.0 / 11900.0).abs() < 1e-9);
    assert!((diff.score() - 0.6807).abs() < 1e-4);
}

#[test]
fn missing_candidate_is_a_false_negative() {
    let x = faces(&[(0.0, 0.0, 100.0, 100.0)]);
    let y = AnnotationTree::new();

    let diff = AnnotationDifference::compute(&x, &y, 0.8);
    assert_eq!(diff.true_positives.len(), 0);
    assert_eq!(diff.false_positives.len(), 0);
    assert_eq!(diff.false_negatives.len(), 1);
    assert_eq!(diff.score(), 0.0);
}

#[test]
fn plain_face_parses_with_defaults() {
    let line = "f[10,10;25,25]";
    let tree = AnnotationTree::parse_line(line).unwrap();
    let face = tree.get(tree.roots()[0]).unwrap();

    assert_eq!(face.feature(), Feature::Face);
    assert_eq!(face.start(), Coord::new(10.0, 10.0));
    assert_eq!((face.width(), face.height()), (25.0, 25.0));
    assert!(face.attributes().all(|(_, a)| a.is_unmarked()));
    assert!(face.category().is_untagged());
    assert!(face.breed().is_breed_unknown());
    assert!(face.orientation().is_zero());
    assert_eq!(tree.to_string(), line);
}

#[test]
fn nested_eyes_are_removed_by_the_size_filter() {
    let mut tree = AnnotationTree::parse_line("f{[10,10;25,25]\tg[male]\ti[0,0;5,5]}").unwrap();
    let face_id = tree.roots()[0];
    let eyes_id = {
        let face = tree.get(face_id).unwrap();
        assert_eq!(face.gender().values(), ["male"]);
        face.children()[0]
    };
    let eyes = tree.get(eyes_id).unwrap();
    assert_eq!(eyes.feature(), Feature::Eyes);
    assert_eq!(*eyes.rect(), Rect::new(10.0, 10.0, 5.0, 5.0));
    assert_eq!(tree.relative_rect(eyes_id).unwrap(), Rect::new(0.0, 0.0, 5.0, 5.0));

    let removed = tree.remove_too_small();
    assert_eq!(removed, vec![eyes_id]);
    assert!(tree.get(face_id).unwrap().children().is_empty());
    assert_eq!(tree.to_string(), "f{[10,10;25,25]\tg[male]}");
}

#[test]
fn forbidden_wound_pair_is_rejected() {
    let mut tree = AnnotationTree::new();
    let rect: Rect<Relative> = Rect::new(0.0, 0.0, 50.0, 50.0);
    let face = tree.insert(Feature::Face, rect, None).unwrap();

    assert!(!tree.set_attribute(face, AttributeKind::Wound, &["blood", "scar"]).unwrap());
    assert!(tree.get(face).unwrap().wound().is_unmarked());

    assert!(tree.set_attribute(face, AttributeKind::Wound, &["blood"]).unwrap());
    assert_eq!(tree.get(face).unwrap().wound().values(), ["blood"]);
}
