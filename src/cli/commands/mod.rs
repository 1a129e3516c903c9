//! Command implementations for the gitsync binary

use std::io::Read;
use std::path::PathBuf;

use crate::backend::SharedBackend;
use crate::cli::error::CliError;
use crate::cli::output::{format_file_state, format_file_state_json};
use crate::context::Context;
use crate::resource::{FileResource, FileSpec};
use crate::validation::FileFormat;

/// Load content from a local file, or from stdin when `input` is `-`
pub fn load_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .map_err(|e| CliError::InvalidArgument(format!("Failed to read stdin: {}", e)))?;
        Ok(content)
    } else {
        let path = PathBuf::from(input);
        std::fs::read_to_string(&path).map_err(|e| CliError::FileReadError(path, e.to_string()))
    }
}

/// Content given inline or through `--file`
pub fn resolve_content(content: Option<String>, file: Option<&str>) -> Result<String, CliError> {
    match (content, file) {
        (Some(content), None) => Ok(content),
        (None, Some(file)) => load_input(file),
        (Some(_), Some(_)) => Err(CliError::InvalidArgument(
            "Use either --content or --file, not both".to_string(),
        )),
        (None, None) => Err(CliError::InvalidArgument(
            "Content is required: pass --content or --file".to_string(),
        )),
    }
}

fn resource_for(
    backend: &SharedBackend,
    path: &str,
    default_branch: &str,
) -> Result<FileResource, CliError> {
    let format = FileFormat::from_path(path).ok_or_else(|| {
        CliError::InvalidArgument(format!(
            "Unsupported file type for {:?}, expected .yaml, .yml, .json or .jsonc",
            path
        ))
    })?;
    Ok(FileResource::new(backend.clone(), format).with_default_branch(default_branch))
}

fn render(state: &crate::resource::FileState, json: bool) -> String {
    if json {
        format_file_state_json(state)
    } else {
        format_file_state(state)
    }
}

/// Handle the read command
pub async fn handle_read(
    ctx: &Context,
    backend: &SharedBackend,
    path: &str,
    branch: &str,
    json: bool,
) -> Result<(), CliError> {
    let resource = resource_for(backend, path, branch)?;
    match resource.read(ctx, path, branch).await? {
        Some(state) => {
            print!("{}", render(&state, json));
            Ok(())
        }
        None => Err(CliError::InvalidArgument(format!(
            "File {:?} does not exist on branch {:?}",
            path, branch
        ))),
    }
}

/// Handle the create command
pub async fn handle_create(
    ctx: &Context,
    backend: &SharedBackend,
    spec: FileSpec,
    default_branch: &str,
) -> Result<(), CliError> {
    let resource = resource_for(backend, &spec.path, default_branch)?;
    let state = resource.create(ctx, &spec).await?;
    println!("Created {} ({})", state.path, state.id);
    Ok(())
}

/// Handle the update command
pub async fn handle_update(
    ctx: &Context,
    backend: &SharedBackend,
    spec: FileSpec,
    default_branch: &str,
) -> Result<(), CliError> {
    let resource = resource_for(backend, &spec.path, default_branch)?;
    let state = resource.update(ctx, &spec).await?;
    println!("Updated {} ({})", state.path, state.id);
    Ok(())
}

/// Handle the delete command
pub async fn handle_delete(
    ctx: &Context,
    backend: &SharedBackend,
    path: &str,
    branch: &str,
) -> Result<(), CliError> {
    let resource = resource_for(backend, path, branch)?;
    resource.delete(ctx, path, branch).await?;
    println!("Deleted {}", path);
    Ok(())
}

/// Handle the id command
pub fn handle_id(backend: &SharedBackend, path: &str, branch: &str) {
    println!("{}", backend.identity(branch, path));
}
