//! Static resources and prompt templates
//!
//! With a content directory configured, files are read on every request so
//! edits show up without a restart. Without one, the texts compiled into the
//! binary are served, so the result never depends on the working directory.
//! Failures are folded into the returned text rather than raised; the host
//! shows whatever comes back.

mod template;

pub use template::render;

use crate::config::ContentConfig;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const COMPANY_INFO_URI: &str = "resource://company_info";
pub const COMPANY_INFO_NAME: &str = "Company Info";
pub const COMPANY_INFO_DESCRIPTION: &str =
    "Provides information about InnoWave Technologies, a leading provider of AI-powered solutions.";

pub const JOB_DESCRIPTION_PROMPT: &str = "Create Job Description";
pub const JOB_DESCRIPTION_PROMPT_DESCRIPTION: &str =
    "Creates a job description for a given role, using the company information.";

const RESOURCE_FILE: &str = "resource.txt";
const PROMPT_FILE: &str = "prompt.txt";

const BUILTIN_RESOURCE: &str = include_str!("../../content/resource.txt");
const BUILTIN_PROMPT: &str = include_str!("../../content/prompt.txt");

pub struct ContentLibrary {
    content_dir: Option<PathBuf>,
}

impl ContentLibrary {
    pub fn new(config: &ContentConfig) -> Self {
        match &config.content_dir {
            Some(dir) => debug!("Serving content from {}", dir.display()),
            None => debug!("Serving built-in content"),
        }
        Self {
            content_dir: config.content_dir.clone(),
        }
    }

    /// Text of the company info resource
    pub async fn company_info(&self) -> String {
        match self.read(RESOURCE_FILE).await {
            Ok(text) => text,
            Err(message) => message,
        }
    }

    /// Job description prompt with `{job_title}` filled in
    pub async fn job_description_prompt(&self, job_title: &str) -> String {
        let template = match self.read(PROMPT_FILE).await {
            Ok(text) => text,
            Err(message) => return message,
        };

        let vars = HashMap::from([("job_title", job_title)]);
        match render(&template, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!("Failed to render {}: {}", PROMPT_FILE, e);
                format!("An error occurred: {}", e)
            }
        }
    }

    async fn read(&self, file_name: &str) -> Result<String, String> {
        let Some(dir) = &self.content_dir else {
            return Ok(builtin(file_name).to_string());
        };

        let path = dir.join(file_name);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            warn!("Failed to read {}: {}", path.display(), e);
            if e.kind() == ErrorKind::NotFound {
                format!("Error: {} not found at {}", file_name, path.display())
            } else {
                format!("An error occurred: {}", e)
            }
        })
    }
}

fn builtin(file_name: &str) -> &'static str {
    if file_name == PROMPT_FILE {
        BUILTIN_PROMPT
    } else {
        BUILTIN_RESOURCE
    }
}
