use nlptag::lexicon::{Lexicon, MapLexicon};
use nlptag::node::from_forms;
use nlptag::train::Trainer;
use nlptag::{Error, FeatureTemplate, Model, Node, Task};

fn entities(words: &str, tags: &str, lexicon: &MapLexicon) -> Vec<Node> {
    let mut nodes = from_forms(words.split_whitespace());
    lexicon.annotate(&mut nodes);
    for (node, tag) in nodes[1..].iter_mut().zip(tags.split_whitespace()) {
        node.part_of_speech_tag = Some("X".to_string());
        node.named_entity_tag = Some(tag.to_string());
    }
    nodes
}

fn lexicon() -> MapLexicon {
    let mut lexicon = MapLexicon::new();
    lexicon.add_gazetteer("Paris", "LOC");
    lexicon.add_gazetteer("Berlin", "LOC");
    lexicon.add_gazetteer("Alice", "PER");
    lexicon.add_cluster("Paris", "10");
    lexicon.add_cluster("Berlin", "10");
    lexicon
}

fn train() -> Model {
    let lexicon = lexicon();
    let mut trainer = Trainer::new(Task::NamedEntity, FeatureTemplate::named_entity());
    trainer.set("algorithm", "adagrad").unwrap();
    trainer.set("max_epochs", "5").unwrap();

    let corpus = [
        ("Alice lives in Paris", "U-PER O O U-LOC"),
        ("Alice visited Berlin", "U-PER O U-LOC"),
        ("Bob likes Paris", "U-PER O U-LOC"),
        ("it is cold in Berlin", "O O O O U-LOC"),
    ];
    for (words, tags) in corpus {
        trainer.append(entities(words, tags, &lexicon)).unwrap();
    }
    let (model, _) = trainer.train().unwrap();
    model
}

fn tags(model: &Model, words: &str) -> Vec<String> {
    let mut nodes = from_forms(words.split_whitespace());
    lexicon().annotate(&mut nodes);
    model.tagger().tag(&mut nodes).unwrap();
    nodes[1..]
        .iter()
        .map(|n| n.named_entity_tag.clone().unwrap())
        .collect()
}

#[test]
fn test_train_save_load_predict() {
    let model = train();
    assert_eq!(model.task(), Task::NamedEntity);
    assert_eq!(model.labels().get("U-PER"), Some(0));
    assert_eq!(model.labels().get_name(1), Some("O"));

    // Use NamedTempFile for automatic cleanup on panic
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    model.save(temp_file.path()).unwrap();
    assert!(temp_file.path().exists());

    let loaded = Model::load(temp_file.path()).unwrap();
    assert_eq!(loaded.num_labels(), model.num_labels());
    assert_eq!(loaded.num_features(), model.num_features());
    assert_eq!(loaded.template(), model.template());

    for words in ["Alice lives in Berlin", "Bob visited Paris", "it is cold"] {
        assert_eq!(tags(&loaded, words), tags(&model, words));
    }
}

#[test]
fn test_load_rejects_mismatched_dimensions() {
    let model = train();
    let mut buf = Vec::new();
    model.to_writer(&mut buf).unwrap();

    let mut value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    value["features"].as_array_mut().unwrap().pop();
    let corrupted = serde_json::to_vec(&value).unwrap();

    let err = Model::from_slice(&corrupted).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { what: "feature", .. }));
}

fn train_tagger(algorithm: &str, extra: &[(&str, &str)]) -> serde_json::Value {
    let mut trainer = Trainer::new(Task::PartOfSpeech, FeatureTemplate::part_of_speech());
    trainer.set("algorithm", algorithm).unwrap();
    trainer.set("max_epochs", "2").unwrap();
    for (name, value) in extra {
        trainer.set(name, value).unwrap();
    }
    let mut nodes = from_forms(["dogs", "bark"]);
    nodes[1].part_of_speech_tag = Some("NNS".to_string());
    nodes[2].part_of_speech_tag = Some("VBP".to_string());
    trainer.append(nodes).unwrap();

    let (model, _) = trainer.train().unwrap();
    let mut buf = Vec::new();
    model.to_writer(&mut buf).unwrap();
    serde_json::from_slice(&buf).unwrap()
}

#[test]
fn test_load_rejects_inconsistent_network_layers() {
    let mut value = train_tagger(
        "ffnn-softmax",
        &[("hidden_dimensions", "4"), ("activation_functions", "relu")],
    );
    assert!(Model::from_slice(&serde_json::to_vec(&value).unwrap()).is_ok());

    let bias = &mut value["optimizer"]["state"]["layers"][0]["bias"];
    bias["dim"] = serde_json::json!([3]);
    bias["data"].as_array_mut().unwrap().pop();

    let err = Model::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch { what: "layer bias", expected: 4, found: 3 }
    ));
}

#[test]
fn test_load_rejects_empty_weight_matrix() {
    let mut value = train_tagger("perceptron", &[]);
    value["optimizer"]["state"]["weights"]["values"] =
        serde_json::json!({"v": 1, "dim": [0, 2], "data": []});

    let err = Model::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch { what: "weight row", found: 0, .. }
    ));
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Model::load(dir.path().join("missing.json")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}
