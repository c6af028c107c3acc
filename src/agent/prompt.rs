//! System prompt assembly.
//!
//! The instruction text is compiled in; deployment-specific pieces come from
//! [`PromptParams`] and from an optional per-project supplementary file
//! under the prompt directory (`<dir>/projects/<project>.md`).

use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Default prompt directory under the user's home.
const DEFAULT_PROMPT_DIR: &str = ".config/kbchat/prompts";

/// Subdirectory holding per-project supplementary text.
const PROJECTS_SUBDIR: &str = "projects";

/// Fixed answering rules shared by every deployment.
const INSTRUCTIONS: &str = "**Instructions:**\n\
- Only answer questions using the provided context from the knowledge base.\n\
- If you use a technical term, briefly explain it in simple language.\n\
- Always cite the source (e.g., 'See Figure 2, Page 5') for every claim.\n\
- If the question is ambiguous or cannot be answered from the context, \
politely ask the user for clarification or say 'Sorry. I don't know.'\n\
- If the user requests a specific response format, follow their instructions.\n";

/// Scaffold written by [`write_project_template`].
const PROJECT_TEMPLATE: &str = "Here are the documents that you have access to:\n\n\
<!-- Replace with outlines or other background the assistant should know. -->\n";

/// Deployment-level inputs to the system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptParams {
    /// Who the assistant is (e.g., `"helpful assistant"`).
    pub persona: String,
    /// Domain terms the model should know.
    pub glossary: String,
    /// Desired tone.
    pub tone: String,
    /// Desired response length.
    pub response_length: String,
    /// Free-form extra instructions.
    pub content: String,
}

impl Default for PromptParams {
    fn default() -> Self {
        Self {
            persona: "helpful assistant".to_string(),
            glossary: String::new(),
            tone: "professional".to_string(),
            response_length: "concise".to_string(),
            content: String::new(),
        }
    }
}

/// Renders the system prompt.
///
/// Pure string assembly: same inputs, same output.
#[must_use]
pub fn render(params: &PromptParams, extra_info: &str) -> String {
    let mut prompt = format!(
        "You are a {}, answering questions from the knowledge base for its users.\n\n",
        params.persona
    );
    prompt.push_str(INSTRUCTIONS);
    let _ = write!(
        prompt,
        "\n**Glossary:** {}\n**Tone:** {}\n**Response Length:** {}\n{}\n\n{}\n",
        params.glossary, params.tone, params.response_length, params.content, extra_info
    );
    prompt
}

/// Resolves the prompt directory: explicit path, else `~/.config/kbchat/prompts`.
#[must_use]
pub fn resolve_prompt_dir(prompt_dir: Option<&Path>) -> Option<PathBuf> {
    prompt_dir
        .map(Path::to_path_buf)
        .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)))
}

/// Returns `true` if `project` can be used as a file stem.
fn is_safe_project_name(project: &str) -> bool {
    !project.is_empty()
        && project != "."
        && project != ".."
        && !project.contains(['/', '\\'])
}

/// Path of the supplementary file for a project.
#[must_use]
pub fn project_file(dir: &Path, project: &str) -> PathBuf {
    dir.join(PROJECTS_SUBDIR).join(format!("{project}.md"))
}

/// Loads the supplementary prompt text for a project.
///
/// Returns an empty string when no project is set, the name is unusable,
/// or the file does not exist.
#[must_use]
pub fn load_project_extra_info(prompt_dir: Option<&Path>, project: Option<&str>) -> String {
    let Some(project) = project.filter(|p| is_safe_project_name(p)) else {
        return String::new();
    };
    resolve_prompt_dir(prompt_dir)
        .map(|dir| project_file(&dir, project))
        .and_then(|path| std::fs::read_to_string(path).ok())
        .unwrap_or_default()
}

/// Writes a supplementary-text template for `project` under `dir`.
///
/// Existing files are **not** overwritten. Returns the path when a file
/// was written.
///
/// # Errors
///
/// Returns an I/O error if the name is unusable or writing fails.
pub fn write_project_template(dir: &Path, project: &str) -> std::io::Result<Option<PathBuf>> {
    if !is_safe_project_name(project) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("invalid project name: {project}"),
        ));
    }
    let path = project_file(dir, project);
    if path.exists() {
        return Ok(None);
    }
    std::fs::create_dir_all(dir.join(PROJECTS_SUBDIR))?;
    std::fs::write(&path, PROJECT_TEMPLATE)?;
    Ok(Some(path))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_params() {
        let params = PromptParams {
            persona: "support engineer".to_string(),
            glossary: "MS: mass spectrometry".to_string(),
            tone: "friendly".to_string(),
            response_length: "short".to_string(),
            content: "Prefer bullet lists.".to_string(),
        };
        let prompt = render(&params, "Books: FTFOC");
        assert!(prompt.starts_with("You are a support engineer"));
        assert!(prompt.contains("**Glossary:** MS: mass spectrometry\n"));
        assert!(prompt.contains("**Tone:** friendly\n"));
        assert!(prompt.contains("**Response Length:** short\n"));
        assert!(prompt.contains("Prefer bullet lists."));
        assert!(prompt.ends_with("Books: FTFOC\n"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let params = PromptParams::default();
        assert_eq!(render(&params, ""), render(&params, ""));
        assert!(render(&params, "").contains("Sorry. I don't know."));
    }

    #[test]
    fn test_project_extra_info_roundtrip() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let written = write_project_template(dir.path(), "naw")
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        assert!(written.is_some());
        // second write leaves the file alone
        let again = write_project_template(dir.path(), "naw")
            .unwrap_or_else(|e| panic!("write failed: {e}"));
        assert!(again.is_none());

        let text = load_project_extra_info(Some(dir.path()), Some("naw"));
        assert!(text.starts_with("Here are the documents"));
    }

    #[test]
    fn test_project_extra_info_missing() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        assert!(load_project_extra_info(Some(dir.path()), Some("other")).is_empty());
        assert!(load_project_extra_info(Some(dir.path()), None).is_empty());
        assert!(load_project_extra_info(Some(dir.path()), Some("../etc")).is_empty());
    }

    #[test]
    fn test_template_rejects_path_names() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        assert!(write_project_template(dir.path(), "a/b").is_err());
    }
}
