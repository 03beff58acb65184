use application::rag_service::{PipelineSettings, RagService};
use domain::error::RagError;
use domain::models::Query;
use domain::prompt::PromptTemplate;
use domain::relevance_policy::{MatchConfidence, NO_MATCH_MESSAGE};
use pretty_assertions::assert_eq;
use tests::{doc, CannedStore, FailingEmbedder, FixedEmbedder, RecordingModel};

fn service(
    store: CannedStore,
    model: RecordingModel,
) -> RagService<FixedEmbedder, CannedStore, RecordingModel> {
    RagService::new(
        FixedEmbedder::new(vec![1.0, 0.0]),
        store,
        model,
        PipelineSettings::default(),
    )
}

fn rag_error(err: &anyhow::Error) -> Option<&RagError> {
    err.chain().find_map(|cause| cause.downcast_ref::<RagError>())
}

#[tokio::test]
async fn answers_capital_of_france_with_sources() {
    let model = RecordingModel::replying("Paris.");
    let store = CannedStore::new(vec![doc(
        "Paris is the capital of France.",
        Some("geo.txt"),
        0.85,
    )]);
    let rag = service(store, model.clone());
    let query = Query::parse("What is the capital of France?").unwrap();

    let mut out: Vec<u8> = Vec::new();
    let answer = rag.query(&query, &mut out).await.unwrap();
    let stdout = String::from_utf8(out).unwrap();

    assert!(stdout.contains("Response: Paris."));
    assert!(stdout.contains("Sources: ['geo.txt']"));
    assert!(!stdout.contains(NO_MATCH_MESSAGE));
    assert_eq!(answer.retrieval.confidence, MatchConfidence::Confident);

    let prompts = model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Paris is the capital of France."));
    assert!(prompts[0].contains("What is the capital of France?"));
}

#[tokio::test]
async fn gibberish_query_reports_no_match_and_still_asks_model() {
    let model = RecordingModel::replying("I don't know.");
    let rag = service(CannedStore::empty(), model.clone());
    let query = Query::parse("asdkjalskdj").unwrap();

    let mut out: Vec<u8> = Vec::new();
    let answer = rag.query(&query, &mut out).await.unwrap();
    let stdout = String::from_utf8(out).unwrap();

    assert!(stdout.contains(NO_MATCH_MESSAGE));
    assert_eq!(answer.retrieval.confidence, MatchConfidence::Low);
    assert_eq!(answer.prompt, PromptTemplate::builtin().render("", "asdkjalskdj"));
    assert!(answer
        .prompt
        .contains("following context:\n\n\n\n---\n\nAnswer the question"));
    assert!(answer.prompt.contains("asdkjalskdj"));
    assert_eq!(model.prompts().len(), 1);
    assert!(stdout.contains("Sources: []"));
}

#[tokio::test]
async fn score_at_threshold_is_confident() {
    let rag = service(
        CannedStore::new(vec![doc("borderline", Some("b.txt"), 0.7)]),
        RecordingModel::replying("ok"),
    );
    let mut out: Vec<u8> = Vec::new();
    rag.query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap();
    assert!(!String::from_utf8(out).unwrap().contains(NO_MATCH_MESSAGE));
}

#[tokio::test]
async fn score_below_threshold_warns_but_proceeds() {
    let model = RecordingModel::replying("a guess");
    let rag = service(
        CannedStore::new(vec![doc("weak match", Some("w.txt"), 0.6999)]),
        model.clone(),
    );
    let mut out: Vec<u8> = Vec::new();
    rag.query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap();
    let stdout = String::from_utf8(out).unwrap();

    assert_eq!(model.prompts().len(), 1);
    let notice = stdout.find(NO_MATCH_MESSAGE).expect("notice printed");
    let prompt = stdout.find("Answer the question based only").unwrap();
    let response = stdout.find("Response: a guess").unwrap();
    assert!(stdout.starts_with("[(Document(page_content='weak match'"));
    assert!(notice < prompt && prompt < response);
}

#[tokio::test]
async fn sources_follow_rank_order() {
    let rag = service(
        CannedStore::new(vec![
            doc("one", Some("z.md"), 0.95),
            doc("two", None, 0.9),
            doc("three", Some("a.md"), 0.8),
        ]),
        RecordingModel::replying("done"),
    );
    let mut out: Vec<u8> = Vec::new();
    let answer = rag
        .query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap();
    assert_eq!(
        answer.formatted.to_string(),
        "Response: done\nSources: ['z.md', None, 'a.md']"
    );
    assert!(answer.prompt.contains("one\n\n---\n\ntwo\n\n---\n\nthree"));
}

#[tokio::test]
async fn keeps_only_top_k() {
    let results = (0..5)
        .map(|i| doc("chunk", Some("s.md"), 0.9 - i as f32 * 0.01))
        .collect();
    let rag = service(CannedStore::new(results), RecordingModel::replying("x"));
    let mut out: Vec<u8> = Vec::new();
    let answer = rag
        .query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap();
    assert_eq!(answer.retrieval.results.len(), 3);
    assert_eq!(answer.formatted.sources.len(), 3);
}

#[tokio::test]
async fn prompt_is_written_before_model_failure() {
    let rag = service(
        CannedStore::new(vec![doc("ctx", Some("c.md"), 0.9)]),
        RecordingModel::failing(RagError::RemoteService("quota exceeded".into())),
    );
    let mut out: Vec<u8> = Vec::new();
    let err = rag
        .query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap_err();
    let stdout = String::from_utf8(out).unwrap();

    assert!(matches!(rag_error(&err), Some(RagError::RemoteService(_))));
    assert!(stdout.contains("Answer the question based on the above context: q"));
    assert!(!stdout.contains("Response:"));
}

#[tokio::test]
async fn embedding_failure_stops_before_anything_is_printed() {
    let model = RecordingModel::replying("unused");
    let rag = RagService::new(
        FailingEmbedder,
        CannedStore::empty(),
        model.clone(),
        PipelineSettings::default(),
    );
    let mut out: Vec<u8> = Vec::new();
    let err = rag
        .query(&Query::parse("q").unwrap(), &mut out)
        .await
        .unwrap_err();

    assert!(matches!(rag_error(&err), Some(RagError::ModelLoad(_))));
    assert!(out.is_empty());
    assert!(model.prompts().is_empty());
}

#[tokio::test]
async fn store_failure_is_propagated() {
    let rag = service(
        CannedStore::failing(RagError::StoreAccess("corrupt".into())),
        RecordingModel::replying("unused"),
    );
    let err = rag
        .query(&Query::parse("q").unwrap(), &mut Vec::<u8>::new())
        .await
        .unwrap_err();
    assert!(matches!(rag_error(&err), Some(RagError::StoreAccess(_))));
}

#[tokio::test]
async fn custom_template_is_used() {
    let model = RecordingModel::replying("x");
    let settings = PipelineSettings {
        template: PromptTemplate::parse("Q: {question}\nC: {context}").unwrap(),
        ..PipelineSettings::default()
    };
    let rag = RagService::new(
        FixedEmbedder::new(vec![1.0]),
        CannedStore::new(vec![doc("facts", None, 0.9)]),
        model.clone(),
        settings,
    );
    rag.query(&Query::parse("why").unwrap(), &mut Vec::<u8>::new())
        .await
        .unwrap();
    assert_eq!(model.prompts(), vec!["Q: why\nC: facts".to_string()]);
}
