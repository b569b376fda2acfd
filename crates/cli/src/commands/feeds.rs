//! Sitemap and RSS commands

use anyhow::Result;
use autoblog_domain::{PostFilter, usecases::FeedRenderer};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::wiring::App;

pub async fn sitemap(config_path: Option<PathBuf>) -> Result<()> {
    let (app, posts) = load_posts(config_path).await?;
    print!("{}", FeedRenderer::new(&app.blog.site).sitemap(&posts));
    Ok(())
}

pub async fn rss(config_path: Option<PathBuf>) -> Result<()> {
    let (app, posts) = load_posts(config_path).await?;
    print!("{}", FeedRenderer::new(&app.blog.site).rss(&posts));
    Ok(())
}

async fn load_posts(config_path: Option<PathBuf>) -> Result<(App, Vec<autoblog_domain::Post>)> {
    let config = AppConfig::load(config_path.as_deref())?;
    let app = App::build(&config).await?;
    let posts = app.store.list_posts(&PostFilter::default()).await?;
    Ok((app, posts))
}
