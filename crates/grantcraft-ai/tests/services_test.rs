use grantcraft_ai::{
    CritiqueRequest, CritiqueService, LLMProvider, MockProvider, RewriteGoal, WritingService,
};
use grantcraft_core::{MechanismId, SectionType};
use std::sync::Arc;

#[tokio::test]
async fn critique_and_writing_share_one_provider() {
    let mock = Arc::new(MockProvider::new());
    mock.push_reply(r#"{"score": 4, "summary": "Solid but incremental."}"#)
        .push_reply("A shorter version of the text.");
    let provider: Arc<dyn LLMProvider> = mock.clone();

    let critique = CritiqueService::new(provider.clone())
        .critique("Aim 1 ...", SectionType::SpecificAims, MechanismId::SbirPhase1)
        .await;
    assert_eq!(critique.score, 4);
    assert_eq!(critique.summary, "Solid but incremental.");
    assert!(critique.strengths.is_empty());

    let rewritten = WritingService::new(provider)
        .rewrite("A much longer version of the text.", RewriteGoal::Concise)
        .await
        .unwrap();
    assert_eq!(rewritten, "A shorter version of the text.");

    let prompts = mock.user_prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("SBIR_PHASE_1") || prompts[0].contains("SBIR"));
    assert!(prompts[1].contains("concise"));
}

#[tokio::test]
async fn bulk_critique_survives_total_outage() {
    let service = CritiqueService::new(Arc::new(MockProvider::failing()));
    let items = vec![
        CritiqueRequest {
            section_type: SectionType::Significance,
            text: "Heart failure affects millions.".into(),
        },
        CritiqueRequest {
            section_type: SectionType::Innovation,
            text: "First in vivo sensor.".into(),
        },
    ];
    let critiques = service.critique_many(&items, MechanismId::R01).await;
    assert_eq!(critiques.len(), 2);
    assert!(critiques.iter().all(|c| c.fallback && c.score == 5));
}
