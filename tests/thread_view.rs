use chrono::{DateTime, Duration, TimeZone, Utc};
use pmthreads::models::{Id, Identity, ThreadNode};
use pmthreads::view::build_from;
use pmthreads::DisplayNode;

fn t(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap() + Duration::minutes(minute)
}

fn node(id: Id, parent_id: Option<Id>, deleted: bool, minute: i64) -> ThreadNode {
    ThreadNode {
        id,
        parent_id,
        content: format!("content of {id}"),
        author_id: id * 10,
        author_name: format!("user{id}"),
        created_at: t(minute),
        updated_at: None,
        deleted,
    }
}

#[test]
fn live_root_with_deleted_reply() {
    let out = build_from(vec![node(1, None, false, 1), node(2, Some(1), true, 2)], None);
    assert_eq!(out.len(), 1);
    let DisplayNode::Visible { node, children, .. } = &out[0] else { panic!("root should be visible") };
    assert_eq!(node.id, 1);
    assert_eq!(children.len(), 1);
    assert!(children[0].is_placeholder());
    assert!(children[0].children().is_empty());
}

#[test]
fn lone_deleted_root_is_gone() {
    assert!(build_from(vec![node(1, None, true, 1)], None).is_empty());
}

#[test]
fn deleted_root_keeps_live_reply_visible() {
    let out = build_from(vec![node(1, None, true, 1), node(2, Some(1), false, 2)], None);
    let DisplayNode::Placeholder { id, children, .. } = &out[0] else { panic!("root should be a placeholder") };
    assert_eq!(*id, 1);
    let DisplayNode::Visible { node, .. } = &children[0] else { panic!("reply should be visible") };
    assert_eq!(node.content, "content of 2");
}

#[test]
fn orphan_is_dropped() {
    assert!(build_from(vec![node(5, Some(999), false, 1)], None).is_empty());
}

#[test]
fn viewer_is_an_explicit_argument() {
    let nodes = vec![node(1, None, false, 1), node(2, None, false, 2)];
    let me = Identity { user_id: 10, name: "user1".into(), admin: false };

    let mine: Vec<(Id, bool)> = build_from(nodes.clone(), Some(&me))
        .iter()
        .map(|d| match d {
            DisplayNode::Visible { node, can_edit, .. } => (node.id, *can_edit),
            DisplayNode::Placeholder { id, .. } => (*id, false),
        })
        .collect();
    // newest first
    assert_eq!(mine, vec![(2, false), (1, true)]);

    assert_eq!(build_from(nodes.clone(), Some(&me)), build_from(nodes, Some(&me)));
}

#[test]
fn roots_sorted_desc_with_stable_ties() {
    let out = build_from(
        vec![node(1, None, false, 5), node(2, None, false, 9), node(3, None, false, 5), node(4, None, false, 1)],
        None,
    );
    let ids: Vec<Id> = out.iter().map(DisplayNode::id).collect();
    assert_eq!(ids, vec![2, 1, 3, 4]);
}
