//! Terminal REPL over a story directory.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use bl_engine::{
    ClassifierConfig, EngineConfig, GameEngine, GameResponse, MemoryIntentCache,
    MemorySessionStore, MemoryStoryStore, ResponseKind, TurnOutcome,
};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Play `story` interactively on stdin and stdout until it ends or input runs out.
pub async fn run(
    dir: &Path,
    story: &str,
    classifier: Option<&str>,
    debug: bool,
) -> Result<(), String> {
    let library = super::load_library(dir)?;
    tracing::debug!(stories = library.len(), dir = %dir.display(), "stories loaded");
    let lookup = |key: &str| std::env::var(key).ok();
    let classifier = match classifier {
        Some(provider) => ClassifierConfig::with_provider(provider, lookup),
        None => ClassifierConfig::from_lookup(lookup),
    }
    .build();

    let mut config = EngineConfig::from_env();
    if debug {
        config = config.with_debug_commands(true);
    }

    let engine = GameEngine::new(
        Arc::new(MemoryStoryStore::from_library(&library)),
        Arc::new(MemorySessionStore::new()),
        Arc::new(MemoryIntentCache::new()),
        classifier,
    )
    .with_config(config);
    engine.init().await;

    let session = engine.create_session().await.map_err(|e| e.to_string())?;
    let session_id = session.id.to_string();
    let intro = engine
        .start_story(&session_id, story)
        .await
        .map_err(|e| e.to_string())?;
    print_response(&intro);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_input: Option<String> = None;

    loop {
        prompt();
        let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "quit" | "exit" => break,
            ":intents" => {
                let intents = engine
                    .available_intents(&session_id)
                    .await
                    .map_err(|e| e.to_string())?;
                for intent in intents {
                    println!("  {} {}", intent.id.cyan(), intent.intent_description);
                }
                continue;
            }
            _ => {}
        }

        let outcome = if let Some(intent_id) = input.strip_prefix(":fix") {
            let Some(previous) = last_input.as_deref() else {
                println!("{}", "Nothing to correct yet.".yellow());
                continue;
            };
            match engine
                .correct_intent(&session_id, previous, intent_id.trim())
                .await
            {
                Ok(correction) => {
                    println!("{}", correction.message.dimmed());
                    correction.response
                }
                Err(e) => {
                    println!("{}", e.to_string().yellow());
                    continue;
                }
            }
        } else {
            last_input = Some(input.to_string());
            engine
                .handle_input(&session_id, input)
                .await
                .map_err(|e| e.to_string())?
        };

        match outcome {
            TurnOutcome::Response(response) => {
                print_response(&response);
                if response.is_end() {
                    break;
                }
            }
            TurnOutcome::SessionExpired(notice) => {
                println!("{}", notice.text.yellow());
                break;
            }
        }
    }

    Ok(())
}

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}

fn print_response(response: &GameResponse) {
    match response.kind {
        ResponseKind::Story | ResponseKind::Intro => println!("\n{}\n", response.text.bold()),
        ResponseKind::Error => println!("{}", response.text.yellow()),
        ResponseKind::Info => println!("{}", response.text),
        ResponseKind::End => {
            println!("\n{}\n", response.text.bold());
            if let Some(ending) = &response.ending {
                println!("  {} {}", "A story by".dimmed(), ending.author_name);
                println!("  {}", ending.redirect.dimmed());
            }
        }
    }
}
