// Allow dead code: wire structs keep fields for completeness
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

/// Shown when a repository has no description.
const DEFAULT_DESCRIPTION: &str = "No description.";

/// Bucket for repositories whose language is unknown.
const DEFAULT_LANGUAGE: &str = "Other";

/// A repository as returned by the GitHub repos listing endpoint. Only the
/// fields the project cards need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub homepage: Option<String>,
    pub language: Option<String>,
    pub stargazers_count: u32,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub fork: bool,
}

/// Filter bucket for the project list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Python,
    Web,
    Other,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Python => write!(f, "python"),
            Category::Web => write!(f, "web"),
            Category::Other => write!(f, "other"),
        }
    }
}

/// A display-ready project card derived from a repository.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub description: String,
    pub html_url: String,
    pub homepage: Option<String>,
    pub language: String,
    pub stars: u32,
    pub topics: Vec<String>,
    pub category: Category,
    pub icon: &'static str,
}

impl Project {
    pub fn from_repo(repo: Repo) -> Self {
        let language = repo.language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let category = categorize(&language, &repo.topics);
        Self {
            name: repo.name,
            description: repo
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            html_url: repo.html_url,
            homepage: repo.homepage.filter(|h| !h.is_empty()),
            icon: language_icon(&language),
            language,
            stars: repo.stargazers_count,
            topics: repo.topics,
            category,
        }
    }
}

/// Bucket a repository by language first, then by web-ish topics.
pub fn categorize(language: &str, topics: &[String]) -> Category {
    if language == "Python" {
        return Category::Python;
    }
    if matches!(language, "HTML" | "CSS" | "JavaScript") {
        return Category::Web;
    }
    if topics.iter().any(|t| t == "web" || t == "frontend") {
        return Category::Web;
    }
    Category::Other
}

/// Accent color for a language dot on a project card.
pub fn language_color(language: &str) -> &'static str {
    match language {
        "JavaScript" => "#f7df1e",
        "Python" => "#3776ab",
        "HTML" => "#e34c26",
        "CSS" => "#264de4",
        "TypeScript" => "#3178c6",
        "Shell" => "#89e051",
        _ => "#888",
    }
}

/// Icon for a project card header.
pub fn language_icon(language: &str) -> &'static str {
    match language {
        "JavaScript" => "🟨",
        "Python" => "🐍",
        "HTML" => "🌐",
        "CSS" => "🎨",
        "TypeScript" => "🔷",
        _ => "📁",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(name: &str) -> Repo {
        Repo {
            name: name.to_string(),
            description: Some("A project.".to_string()),
            html_url: format!("https://github.com/user/{}", name),
            homepage: None,
            language: Some("Python".to_string()),
            stargazers_count: 3,
            topics: vec![],
            fork: false,
        }
    }

    #[test]
    fn test_categorize_by_language() {
        assert_eq!(categorize("Python", &[]), Category::Python);
        assert_eq!(categorize("JavaScript", &[]), Category::Web);
        assert_eq!(categorize("HTML", &[]), Category::Web);
        assert_eq!(categorize("Rust", &[]), Category::Other);
    }

    #[test]
    fn test_categorize_by_topic_fallback() {
        let topics = vec!["frontend".to_string()];
        assert_eq!(categorize("Rust", &topics), Category::Web);
        assert_eq!(categorize("Python", &topics), Category::Python);
    }

    #[test]
    fn test_from_repo_defaults() {
        let mut r = repo("thing");
        r.description = None;
        r.language = None;
        r.homepage = Some(String::new());

        let project = Project::from_repo(r);
        assert_eq!(project.description, "No description.");
        assert_eq!(project.language, "Other");
        assert_eq!(project.icon, "📁");
        assert!(project.homepage.is_none());
        assert_eq!(project.category, Category::Other);
    }

    #[test]
    fn test_parses_github_repo_json() {
        let json = r#"{
            "name": "portfolio",
            "description": "My site",
            "html_url": "https://github.com/user/portfolio",
            "homepage": "https://user.dev",
            "language": "JavaScript",
            "stargazers_count": 7,
            "topics": ["web", "portfolio"],
            "fork": false,
            "id": 42,
            "private": false
        }"#;

        let repo: Repo = serde_json::from_str(json).unwrap();
        assert_eq!(repo.name, "portfolio");
        assert_eq!(repo.stargazers_count, 7);

        let project = Project::from_repo(repo);
        assert_eq!(project.category, Category::Web);
        assert_eq!(project.icon, "🟨");
    }

    #[test]
    fn test_topics_and_fork_default_when_absent() {
        let json = r#"{
            "name": "old-repo",
            "description": null,
            "html_url": "https://github.com/user/old-repo",
            "homepage": null,
            "language": null,
            "stargazers_count": 0
        }"#;

        let repo: Repo = serde_json::from_str(json).unwrap();
        assert!(repo.topics.is_empty());
        assert!(!repo.fork);
    }
}
