//! Template commands

use std::path::{Path, PathBuf};

use clap::Subcommand;
use spo_types::{Template, TemplateDocument};

use crate::error::{CliError, CliResult};

/// Template subcommands
#[derive(Debug, Subcommand)]
pub enum TemplateCommands {
    /// List templates in a directory
    List {
        /// Templates directory
        #[arg(long, default_value = "settings")]
        dir: PathBuf,
    },

    /// Print a template
    Show {
        /// Template name or path
        name: PathBuf,

        /// Templates directory
        #[arg(long, default_value = "settings")]
        dir: PathBuf,
    },

    /// Write an empty template
    Init {
        /// Template name
        name: String,

        /// Templates directory
        #[arg(long, default_value = "settings")]
        dir: PathBuf,

        /// Overwrite an existing template
        #[arg(long)]
        force: bool,
    },
}

pub fn run(command: TemplateCommands) -> CliResult<()> {
    match command {
        TemplateCommands::List { dir } => {
            let names = list_templates(&dir)?;
            if names.is_empty() {
                println!("No templates in {}", dir.display());
            }
            for name in names {
                println!("{}", name);
            }
            Ok(())
        }
        TemplateCommands::Show { name, dir } => {
            let path = resolve_template(&name, &dir);
            let document = TemplateDocument::load(&path)?;
            print!("{}", serde_yaml::to_string(&document)?);

            match Template::try_from(document) {
                Ok(template) => println!(
                    "# {} gold pairs{}",
                    template.gold_qa.len(),
                    template.length_clause()
                ),
                Err(err) => println!("# not usable for optimization: {}", err),
            }
            Ok(())
        }
        TemplateCommands::Init { name, dir, force } => {
            let path = init_template(&name, &dir, force)?;
            println!("Created {}", path.display());
            Ok(())
        }
    }
}

/// An existing path is used as is; otherwise `name` is looked up in `dir`,
/// with `.yaml` added when it has no extension.
pub fn resolve_template(name: &Path, dir: &Path) -> PathBuf {
    if name.exists() {
        return name.to_path_buf();
    }
    let mut path = dir.join(name);
    if path.extension().is_none() {
        path.set_extension("yaml");
    }
    path
}

/// Template names (file stems) in `dir`, sorted.
pub fn list_templates(dir: &Path) -> CliResult<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        if !is_yaml {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

pub fn init_template(name: &str, dir: &Path, force: bool) -> CliResult<PathBuf> {
    if name.trim().is_empty() || name.contains(['/', '\\']) {
        return Err(CliError::InvalidInput(format!(
            "template name '{}' must be a plain file name",
            name
        )));
    }

    let path = resolve_template(Path::new(name), dir);
    if path.exists() && !force {
        return Err(CliError::InvalidInput(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )));
    }

    TemplateDocument::skeleton().save(&path)?;
    Ok(path)
}
