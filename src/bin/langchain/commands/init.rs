use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::templates::{self, ProjectTemplate};

/// Writes every file of `template` under `root`, returning the created paths.
pub fn scaffold(root: &Path, project_name: &str, template: &ProjectTemplate) -> Result<Vec<PathBuf>> {
    let mut created = Vec::with_capacity(template.files.len());
    for (relative, content) in template.files {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, templates::render(content, project_name))
            .with_context(|| format!("failed to write {}", path.display()))?;
        log::debug!("wrote {}", path.display());
        created.push(path);
    }
    Ok(created)
}

pub fn init(project_name: &str, template_name: &str, force: bool) -> Result<()> {
    let Some(template) = templates::find_template(template_name) else {
        bail!(
            "template '{}' not found. Available templates: {}",
            template_name,
            templates::template_names().join(", ")
        );
    };

    let root = PathBuf::from(project_name);
    if root.exists() {
        if !force {
            bail!(
                "directory '{}' already exists. Use --force to overwrite",
                root.display()
            );
        }
        log::warn!("overwriting files in {}", root.display());
    }

    let name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| project_name.to_string());

    println!("Creating project '{}' from template '{}'", name, template.name);
    println!("{}\n", template.description);

    let created = scaffold(&root, &name, template)?;
    for path in &created {
        println!("  Created: {}", path.display());
    }

    println!("\nNext steps:");
    println!("  cd {}", root.display());
    for line in template.instructions.lines().filter(|l| !l.trim().is_empty()) {
        println!("  {}", line.trim());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaffold_renders_placeholders() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("my-bot");
        let template = templates::find_template("chat-bot").unwrap();

        let created = scaffold(&root, "my-bot", template).unwrap();
        assert_eq!(created.len(), template.files.len());

        let manifest = fs::read_to_string(root.join("Cargo.toml")).unwrap();
        assert!(manifest.contains("name = \"my-bot\""));
        assert!(!manifest.contains("{{"));
        assert!(root.join("src/main.rs").is_file());
    }

    #[test]
    fn test_rag_template_includes_documents() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("rag");
        scaffold(&root, "rag", templates::find_template("rag-system").unwrap()).unwrap();
        assert!(root.join("documents/sample.txt").is_file());
    }

    #[test]
    fn test_unknown_template() {
        let err = init("whatever", "nope", false).unwrap_err().to_string();
        assert!(err.starts_with("template 'nope' not found. Available templates: basic-llm"));
    }

    #[test]
    fn test_existing_directory_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().to_string_lossy().into_owned();
        let err = init(&path, "basic-llm", false).unwrap_err().to_string();
        assert_eq!(
            err,
            format!("directory '{}' already exists. Use --force to overwrite", path)
        );
    }
}
