//! Posts command - CRUD over the configured post store

use anyhow::{Context, Result, bail};
use autoblog_domain::{Post, PostFilter};
use std::path::PathBuf;

use crate::args::{PostsArgs, PostsCommands};
use crate::commands::read_input;
use crate::config::AppConfig;
use crate::wiring::App;

pub async fn execute(args: PostsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;
    let store = &app.store;

    match args.command {
        PostsCommands::List {
            category,
            limit,
            offset,
        } => {
            let filter = PostFilter {
                category,
                limit,
                offset,
            };
            let posts = store.list_posts(&filter).await?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        }
        PostsCommands::Get { slug } => match store.get_post(&slug).await? {
            Some(post) => println!("{}", serde_json::to_string_pretty(&post)?),
            None => bail!("Post not found: {}", slug),
        },
        PostsCommands::Save { file } => {
            let body = read_input(&file)?;
            let post: Post = serde_json::from_str(&body)
                .with_context(|| format!("Invalid post JSON in {}", file.display()))?;
            let saved = store.save_post(&post).await?;
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        PostsCommands::Delete { slug } => {
            if store.delete_post(&slug).await? {
                println!("Deleted post: {}", slug);
            } else {
                bail!("Post not found: {}", slug);
            }
        }
    }

    Ok(())
}
