use nlptag::node::from_forms;
use nlptag::{L2RState, Node, Task};

fn entities(labels: &[&str]) -> Vec<Node> {
    let forms: Vec<String> = (0..labels.len()).map(|i| format!("w{}", i)).collect();
    let mut nodes = from_forms(forms);
    for (node, label) in nodes[1..].iter_mut().zip(labels) {
        node.named_entity_tag = Some(label.to_string());
    }
    nodes
}

fn follow_oracle(state: &mut L2RState<'_>) {
    while !state.is_terminal() {
        let gold = state.oracle().unwrap().to_string();
        state.apply_transition(&gold).unwrap();
    }
}

#[test]
fn test_oracle_without_transitions_scores_zero() {
    let mut nodes = entities(&["B-PER", "O", "U-LOC"]);
    let mut state = L2RState::new(&mut nodes, Task::NamedEntity);
    state.save_oracle();

    let acc = state.evaluate(None);
    assert_eq!(acc.correct, 0);
    assert_eq!(acc.total, 3);
}

#[test]
fn test_following_oracle_scores_full() {
    let mut nodes = entities(&["B-PER", "L-PER", "O", "U-LOC"]);
    let mut state = L2RState::new(&mut nodes, Task::NamedEntity);
    state.save_oracle();
    follow_oracle(&mut state);

    assert!(state.is_terminal());
    assert_eq!(state.evaluate(None).score(), 100.0);
}

#[test]
fn test_gold_forcing_restores_labels() {
    let mut nodes = entities(&["A", "B", "A"]);
    {
        let mut state = L2RState::new(&mut nodes, Task::NamedEntity);
        state.save_oracle();
        assert_eq!(state.oracle(), Some("A"));
        follow_oracle(&mut state);

        let acc = state.evaluate(None);
        assert_eq!((acc.correct, acc.total), (3, 3));
    }

    let labels: Vec<_> = nodes[1..]
        .iter()
        .map(|n| n.named_entity_tag.as_deref())
        .collect();
    assert_eq!(labels, [Some("A"), Some("B"), Some("A")]);
    assert_eq!(nodes[0].named_entity_tag.as_deref(), Some(nlptag::node::ROOT));
}

#[test]
fn test_wrong_transition_counts_as_error() {
    let mut nodes = entities(&["A", "B"]);
    let mut state = L2RState::new(&mut nodes, Task::NamedEntity);
    state.save_oracle();
    state.apply_transition("A").unwrap();
    state.apply_transition("A").unwrap();

    let acc = state.evaluate(None);
    assert_eq!((acc.correct, acc.total), (1, 2));
}

#[test]
fn test_part_of_speech_task_uses_its_own_field() {
    let mut nodes = from_forms(["run"]);
    nodes[1].part_of_speech_tag = Some("VB".to_string());
    nodes[1].named_entity_tag = Some("O".to_string());
    {
        let mut state = L2RState::new(&mut nodes, Task::PartOfSpeech);
        state.save_oracle();
        state.apply_transition("NN").unwrap();
    }
    assert_eq!(nodes[1].part_of_speech_tag.as_deref(), Some("NN"));
    assert_eq!(nodes[1].named_entity_tag.as_deref(), Some("O"));
}
