//! Prompt construction for every generative step

use serde_json::{Value, json};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::config::BlogConfig;
use crate::model::{Friend, Typology};

/// Competitor titles included in the overlap prompt
pub const MAX_COMPETITOR_TITLES: usize = 50;

/// Recent titles shown to the director
pub const DIRECTOR_HISTORY: usize = 10;

/// Content excerpt shown when asking for a backlink sentence
pub const BACKLINK_EXCERPT_CHARS: usize = 1000;

pub const OVERLAP_VERDICT: &str = "TOO_SIMILAR";

/// Calendar date for prompts that reason about "recent"
pub fn prompt_date(now: OffsetDateTime) -> String {
    now.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| now.date().to_string())
}

pub struct TopicPrompt<'a> {
    pub config: &'a BlogConfig,
    pub typology: Typology,
    pub memory: &'a [String],
    pub headlines: &'a [String],
    pub now: OffsetDateTime,
}

impl TopicPrompt<'_> {
    pub fn render(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are a content strategist for a blog called \"{}\".\n",
            self.config.site.name
        ));
        prompt.push_str(&format!("Today's date is {}.\n", prompt_date(self.now)));
        prompt.push_str(&format!("The typology is \"{}\".\n", self.typology));
        prompt.push_str(&format!(
            "Typology intent: {}\n\n",
            self.config.intent_for(self.typology)
        ));

        if self.memory.is_empty() {
            prompt.push_str("Existing topics: none yet\n");
        } else {
            prompt.push_str(&format!("Existing topics: {}\n", self.memory.join(", ")));
        }
        prompt.push_str(&format!(
            "Avoid repeating anything covered in the last {} days.\n",
            self.config.competitors.behavior.topic_avoidance_days
        ));

        if !self.headlines.is_empty() {
            prompt.push_str("\nCurrent headlines from our sources:\n");
            for headline in self.headlines {
                prompt.push_str(&format!("- {}\n", headline));
            }
        }

        prompt.push_str(
            "\nSuggest a new, unique, and highly engaging article topic.\n\
             Return a JSON object with:\n\
             - title: The proposed headline\n\
             - focus: A brief summary of what the article should cover\n",
        );
        prompt
    }

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "focus": { "type": "string" }
            },
            "required": ["title", "focus"]
        })
    }
}

pub struct DraftPrompt<'a> {
    pub config: &'a BlogConfig,
    pub typology: Typology,
    pub title: &'a str,
    pub focus: &'a str,
    pub research: &'a str,
    pub seo_intensity: u8,
    pub custom_context: Option<&'a str>,
    pub now: OffsetDateTime,
}

impl DraftPrompt<'_> {
    pub fn render(&self) -> String {
        let mut prompt = String::new();
        prompt.push_str("You are a professional blog author.\n");
        prompt.push_str(&format!("Today's date is {}.\n", prompt_date(self.now)));
        prompt.push_str(&format!("Goal: Write a post with title \"{}\".\n", self.title));
        if !self.focus.is_empty() {
            prompt.push_str(&format!("Focus: {}\n", self.focus));
        }
        prompt.push_str(&format!(
            "Typology Intent: {}\n",
            self.config.intent_for(self.typology)
        ));
        prompt.push_str(&format!("Research Context: {}\n\n", self.research));

        prompt.push_str(&format!(
            "SEO Strategy (Intensity {}/10):\n{}\n\n",
            self.seo_intensity,
            seo_instruction(self.seo_intensity)
        ));

        if let Some(context) = self.custom_context.filter(|c| !c.trim().is_empty()) {
            prompt.push_str(&format!("Additional instructions: {}\n\n", context.trim()));
        }
        if let Some(language) = &self.config.content.language {
            prompt.push_str(&format!("Write in {}.\n", language));
        }

        prompt.push_str(&format!(
            "The post should be in Markdown format.\n\
             Include a title, an excerpt, and the main content.\n\
             Target word count: {} words.\n\n\
             Return a JSON object with:\n\
             - title: The final headline\n\
             - excerpt: A catchy 1-2 sentence summary\n\
             - content: The full markdown content\n\
             - slug: A URL-friendly slug (style: {})\n",
            self.config.length_target(self.typology),
            slug_style_name(self.config)
        ));
        prompt
    }

    pub fn schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "excerpt": { "type": "string" },
                "content": { "type": "string" },
                "slug": { "type": "string" }
            },
            "required": ["title", "excerpt", "content", "slug"]
        })
    }
}

fn slug_style_name(config: &BlogConfig) -> &'static str {
    match config.content.slug_style {
        crate::config::SlugStyle::Hyphenated => "lowercase words joined by hyphens",
        crate::config::SlugStyle::Underscore => "lowercase words joined by underscores",
    }
}

/// Banded SEO instruction: <3 ignore keywords, 3-7 balance, >7 aggressive
pub fn seo_instruction(intensity: u8) -> &'static str {
    if intensity < 3 {
        "- Focus purely on user value and readability. Ignore keywords."
    } else if intensity > 7 {
        "- Aggressively optimize. Use the main keyword in H1, first paragraph, and H2s. Keep density high."
    } else {
        "- Balance readability with keyword usage. Include keyword in title and opening."
    }
}

pub fn overlap_prompt(title: &str, competitor_titles: &[String]) -> String {
    let shown = &competitor_titles[..competitor_titles.len().min(MAX_COMPETITOR_TITLES)];
    format!(
        "Current topic: \"{}\"\n\
         Competitor topics: {}\n\n\
         Is the current topic too similar to any of the competitor topics?\n\
         Respond with \"{}\" or \"UNIQUE\".",
        title,
        shown.join(", "),
        OVERLAP_VERDICT
    )
}

pub fn backlink_prompt(content: &str, friend: &Friend) -> String {
    format!(
        "Content: {}...\n\
         Friend: {} ({})\n\n\
         Suggest a natural sentence to insert into the content that links to this friend.\n\
         The sentence should be relevant and not spammy.\n\
         Return ONLY the sentence with the markdown link.",
        truncate_chars(content, BACKLINK_EXCERPT_CHARS),
        friend.name,
        friend.base_url
    )
}

pub fn director_prompt(config: &BlogConfig, available: &[Typology], recent: &[String]) -> String {
    let definitions: Vec<String> = config
        .typologies
        .iter()
        .filter(|d| available.contains(&d.id))
        .map(|d| format!("- {}: {}", d.id, d.intent))
        .collect();
    let typologies = if definitions.is_empty() {
        available
            .iter()
            .map(|t| t.id())
            .collect::<Vec<_>>()
            .join(", ")
    } else {
        definitions.join("\n")
    };
    let history = if recent.is_empty() {
        "(nothing published yet)".to_string()
    } else {
        recent[..recent.len().min(DIRECTOR_HISTORY)].join("\n")
    };

    format!(
        "You are the Editor-in-Chief of \"{}\".\n\
         Your goal is to maintain a balanced and engaging content calendar.\n\n\
         Available Content Typologies:\n{}\n\n\
         Recently Published Articles:\n{}\n\n\
         Task:\n\
         Analyze the recent history.\n\
         - If we have too many news items, pick a guide or deep dive.\n\
         - If we haven't covered news in a while, pick news.\n\
         - If a typology is underrepresented, prioritize it.\n\n\
         Return ONLY the ID of the typology you select (e.g., \"news\", \"guide\").\n\
         Do not include any explanation.",
        config.site.name, typologies, history
    )
}

pub fn research_questions_prompt(topic: &str, count: usize, now: OffsetDateTime) -> String {
    format!(
        "Today's date is {}.\n\
         You are a research analyst preparing an in-depth article on: \"{}\".\n\
         Write {} distinct web search queries that together cover the latest \
         developments, technical details, and open debates on this topic.",
        prompt_date(now),
        topic,
        count
    )
}

pub fn research_questions_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "queries": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["queries"]
    })
}

pub fn learnings_prompt(query: &str, material: &str) -> String {
    format!(
        "Search query: \"{}\"\n\n\
         Source material:\n{}\n\n\
         Extract between 3 and 5 concise, factual learnings from the material. \
         Include concrete names, numbers, and dates where available.",
        query, material
    )
}

pub fn learnings_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "learnings": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["learnings"]
    })
}

/// Cut at a char boundary
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
