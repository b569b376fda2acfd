//! Sitemap and RSS views derived from the post list

use time::OffsetDateTime;
use time::format_description::well_known::{Rfc2822, Rfc3339};

use crate::config::SiteConfig;
use crate::model::{Post, PostStatus};

/// Items in the RSS channel
pub const RSS_ITEMS: usize = 20;

/// Renders XML views of published posts
pub struct FeedRenderer<'a> {
    site: &'a SiteConfig,
}

impl<'a> FeedRenderer<'a> {
    pub fn new(site: &'a SiteConfig) -> Self {
        Self { site }
    }

    /// `<urlset>` with the blog index and one entry per published post
    pub fn sitemap(&self, posts: &[Post]) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
        );
        xml.push_str(&format!(
            "  <url><loc>{}</loc></url>\n",
            escape_xml(&self.site.blog_url())
        ));

        for post in published(posts) {
            xml.push_str(&format!(
                "  <url><loc>{}</loc>",
                escape_xml(&self.site.post_url(&post.slug))
            ));
            if let Some(modified) = post.updated_at.or(post.created_at) {
                if let Ok(date) = modified.format(&Rfc3339) {
                    xml.push_str(&format!("<lastmod>{}</lastmod>", date));
                }
            }
            xml.push_str("</url>\n");
        }

        xml.push_str("</urlset>\n");
        xml
    }

    /// RSS 2.0 channel with the newest published posts
    pub fn rss(&self, posts: &[Post]) -> String {
        let blog_url = self.site.blog_url();
        let mut xml = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n",
        );
        xml.push_str(&format!("  <title>{}</title>\n", escape_xml(&self.site.name)));
        xml.push_str(&format!("  <link>{}</link>\n", escape_xml(&blog_url)));
        xml.push_str(&format!(
            "  <description>Latest posts from {}</description>\n",
            escape_xml(&self.site.name)
        ));

        for post in published(posts).take(RSS_ITEMS) {
            let link = escape_xml(&self.site.post_url(&post.slug));
            xml.push_str("  <item>\n");
            xml.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            xml.push_str(&format!("    <link>{}</link>\n", link));
            xml.push_str(&format!(
                "    <description>{}</description>\n",
                escape_xml(&post.excerpt)
            ));
            if let Some(date) = post.published_at.or(post.created_at).and_then(rfc2822) {
                xml.push_str(&format!("    <pubDate>{}</pubDate>\n", date));
            }
            xml.push_str(&format!("    <guid>{}</guid>\n", link));
            xml.push_str("  </item>\n");
        }

        xml.push_str("</channel>\n</rss>\n");
        xml
    }
}

fn published(posts: &[Post]) -> impl Iterator<Item = &Post> {
    posts.iter().filter(|p| p.status == PostStatus::Published)
}

fn rfc2822(date: OffsetDateTime) -> Option<String> {
    date.format(&Rfc2822).ok()
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
