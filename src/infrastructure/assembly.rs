// Copyright 2025 JiangLong.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cloud assembly: one template per stack plus a manifest.

use crate::infrastructure::cloudformation::{SynthesizedStack, TemplateFormat};
use crate::infrastructure::constants::{MANIFEST_FILE_NAME, MANIFEST_VERSION};
use crate::shared::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    pub template_file: String,
    pub resource_count: usize,
    pub outputs: Vec<String>,
    pub dependency_order_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub version: String,
    pub stacks: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn from_stacks(stacks: &[SynthesizedStack], format: TemplateFormat) -> Self {
        let stacks = stacks
            .iter()
            .map(|s| ManifestEntry {
                stack_name: s.stack_name.clone(),
                region: s.region.clone(),
                account: s.account.clone(),
                template_file: s.template_file_name(format),
                resource_count: s.resource_count(),
                outputs: s.outputs.clone(),
                dependency_order_length: s.order.len(),
            })
            .collect();
        Self {
            version: MANIFEST_VERSION.to_string(),
            stacks,
        }
    }

    pub fn stack(&self, name: &str) -> Option<&ManifestEntry> {
        self.stacks.iter().find(|s| s.stack_name == name)
    }
}

/// Rendered files of an assembly, keyed by file name.
pub fn render_assembly(
    stacks: &[SynthesizedStack],
    format: TemplateFormat,
) -> Result<BTreeMap<String, String>> {
    let mut files = BTreeMap::new();
    for stack in stacks {
        files.insert(stack.template_file_name(format), stack.render(format)?);
    }
    let manifest = Manifest::from_stacks(stacks, format);
    files.insert(
        MANIFEST_FILE_NAME.to_string(),
        serde_json::to_string_pretty(&manifest)?,
    );
    Ok(files)
}

#[async_trait::async_trait]
pub trait AssemblyWriter: Send + Sync {
    /// Writes every template and the manifest; returns the manifest written.
    async fn write(&self, stacks: &[SynthesizedStack], format: TemplateFormat) -> Result<Manifest>;

    /// Where the assembly lands, for display.
    fn location(&self) -> String;
}

/// Writes the assembly into a directory, creating it if needed.
pub struct FsAssemblyWriter {
    out_dir: PathBuf,
}

impl FsAssemblyWriter {
    pub fn new(out_dir: impl AsRef<Path>) -> Self {
        Self {
            out_dir: out_dir.as_ref().to_path_buf(),
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

#[async_trait::async_trait]
impl AssemblyWriter for FsAssemblyWriter {
    async fn write(&self, stacks: &[SynthesizedStack], format: TemplateFormat) -> Result<Manifest> {
        tokio::fs::create_dir_all(&self.out_dir).await?;
        for (name, contents) in render_assembly(stacks, format)? {
            let path = self.out_dir.join(&name);
            tokio::fs::write(&path, contents).await?;
            tracing::debug!(path = %path.display(), "wrote assembly file");
        }
        tracing::info!(
            out_dir = %self.out_dir.display(),
            stacks = stacks.len(),
            "cloud assembly written"
        );
        Ok(Manifest::from_stacks(stacks, format))
    }

    fn location(&self) -> String {
        self.out_dir.display().to_string()
    }
}

/// Keeps the assembly in memory; used by tests and dry runs.
#[derive(Default)]
pub struct MemoryAssemblyWriter {
    files: Mutex<BTreeMap<String, String>>,
}

impl MemoryAssemblyWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn file(&self, name: &str) -> Option<String> {
        self.files.lock().await.get(name).cloned()
    }

    pub async fn file_names(&self) -> Vec<String> {
        self.files.lock().await.keys().cloned().collect()
    }
}

#[async_trait::async_trait]
impl AssemblyWriter for MemoryAssemblyWriter {
    async fn write(&self, stacks: &[SynthesizedStack], format: TemplateFormat) -> Result<Manifest> {
        let rendered = render_assembly(stacks, format)?;
        let mut files = self.files.lock().await;
        files.extend(rendered);
        Ok(Manifest::from_stacks(stacks, format))
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{CfnResource, LogicalId, Props};
    use crate::domain::stack::{Environment, Stack};
    use crate::infrastructure::cloudformation::synthesize;

    fn synthesized() -> SynthesizedStack {
        let mut stack = Stack::new("Small", Environment::new(None, "eu-west-1")).unwrap();
        stack
            .add_resource(CfnResource::new(LogicalId::new("Vpc"), "AWS::EC2::VPC", Props::new()))
            .unwrap();
        synthesize(&stack).unwrap()
    }

    #[tokio::test]
    async fn test_memory_writer_collects_files() {
        let writer = MemoryAssemblyWriter::new();
        let manifest = writer
            .write(&[synthesized()], TemplateFormat::Json)
            .await
            .unwrap();

        assert_eq!(
            writer.file_names().await,
            vec!["Small.template.json".to_string(), "manifest.json".to_string()]
        );
        let entry = manifest.stack("Small").unwrap();
        assert_eq!(entry.region, "eu-west-1");
        assert_eq!(entry.resource_count, 1);
        assert!(writer.file("manifest.json").await.unwrap().contains("Small.template.json"));
    }
}
