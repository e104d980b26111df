//! CLI views of stored items.
//!
//! `sieve items` lists items with the same filters as `GET /api/items`;
//! `sieve get` prints one item with its score breakdown and Q&A history.

use anyhow::{bail, Result};

use crate::models::StoredItem;
use crate::store::{ItemQuery, ItemStore};

pub async fn run_list(store: &dyn ItemStore, query: &ItemQuery) -> Result<()> {
    let items = store.list_items(query).await?;

    if items.is_empty() {
        println!("No items.");
        return Ok(());
    }

    for item in &items {
        println!(
            "{:>5}  {:>3}  {:<12} {}",
            item.id, item.total_score, item.source, item.title
        );
        println!("             {}", item.url);
    }
    println!();
    println!("{} item(s)", items.len());
    Ok(())
}

pub async fn run_get(store: &dyn ItemStore, id: i64) -> Result<()> {
    let item = match store.find_by_id(id).await? {
        Some(item) => item,
        None => bail!("item not found: {}", id),
    };

    print_item(&item);

    let questions = store.questions_for(id).await?;
    if !questions.is_empty() {
        println!("--- Questions ({}) ---", questions.len());
        for q in &questions {
            println!("[{}] Q: {}", q.created_at, q.question);
            println!("A: {}", q.answer);
            println!();
        }
    }
    Ok(())
}

fn print_item(item: &StoredItem) {
    println!("--- Item ---");
    println!("id:           {}", item.id);
    println!("title:        {}", item.title);
    println!("source:       {}", item.source);
    println!("url:          {}", item.url);
    if !item.author.is_empty() {
        println!("author:       {}", item.author);
    }
    println!("published_at: {}", item.published_at);
    println!("created_at:   {}", item.created_at);
    println!("pushed:       {}", item.pushed);
    println!();

    println!("--- Score ({}) ---", item.total_score);
    println!("scarcity:     {:>2}/25", item.scarcity_score);
    println!("actionable:   {:>2}/25", item.actionable_score);
    println!("leverage:     {:>2}/25", item.leverage_score);
    println!(
        "resonance:    {:>2}/25  (importance {}/8, benefit {}/9, noble {}/8)",
        item.resonance_score, item.importance_score, item.benefit_score, item.noble_score
    );
    println!("reason:       {}", item.score_reason);
    println!();

    if !item.description.is_empty() {
        println!("--- Description ---");
        println!("{}", item.description);
        println!();
    }
}
