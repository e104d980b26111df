//! Question answering about stored items.
//!
//! Used by `POST /api/items/{id}/ask` and `sieve ask`. Validation happens
//! before any lookup, and the lookup before any scoring call, so a bad
//! request never reaches the model and never writes a row.

use serde::Serialize;

use crate::error::AskError;
use crate::models::NewQuestion;
use crate::store::ItemStore;
use crate::traits::Scorer;

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub answer: String,
    pub question_id: i64,
}

pub async fn ask_about_item(
    store: &dyn ItemStore,
    scorer: &dyn Scorer,
    item_id: i64,
    question: &str,
) -> Result<AskResponse, AskError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(AskError::EmptyQuestion);
    }

    let stored = store
        .find_by_id(item_id)
        .await?
        .ok_or(AskError::NotFound(item_id))?;

    let answer = scorer.ask(&stored.to_item(), question).await?;

    let question_id = store
        .insert_question(&NewQuestion {
            item_id,
            question: question.to_string(),
            answer: answer.clone(),
        })
        .await?;

    Ok(AskResponse {
        answer,
        question_id,
    })
}
