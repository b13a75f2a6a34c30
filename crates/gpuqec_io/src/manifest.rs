//! Binding manifests: module and function declarations in TOML.
//!
//! ```toml
//! [[module]]
//! name = "Decoder"
//! file = "cudaq-qec"
//!
//! [[module.function]]
//! name = "reset_decoder_ui64"
//! signature = "(self: Decoder @inout, decoder_id: int) -> None"
//! call_id = "hash"
//! ```
//!
//! Declarations built from a manifest carry the manifest path and the line of
//! each declaration, so registry diagnostics point back into the file.

use crate::parser::{is_builtin_type, parse_signature};
use anyhow::{Context, Result, bail};
use gpuqec_core::module::GpuModuleDef;
use gpuqec_core::registry::{CallIdSpec, FunctionDecl, ModuleDecl, Registry};
use gpuqec_core::ty::FunctionType;
use gpuqec_core::validate::SourceLocation;
use serde::Deserialize;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use toml::Spanned;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Skip registration entirely, for documentation builds.
    #[serde(default)]
    pub documentation: bool,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
    /// Device functions not attached to a module.
    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionEntry>,
    #[serde(skip)]
    source: Source,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub name: Spanned<String>,
    pub file: String,
    #[serde(default)]
    pub config: Option<String>,
    #[serde(default)]
    pub init_arg: bool,
    /// Constructor signature; synthesised from `init_arg` when absent.
    #[serde(default)]
    pub constructor: Option<String>,
    #[serde(default)]
    pub discard: Option<String>,
    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FunctionEntry {
    pub name: Spanned<String>,
    pub signature: String,
    #[serde(default)]
    pub call_id: Option<CallIdEntry>,
}

/// Either an explicit id or the keyword `"hash"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CallIdEntry {
    Id(u32),
    Keyword(String),
}

impl CallIdEntry {
    fn spec(&self) -> Result<CallIdSpec> {
        match self {
            CallIdEntry::Id(id) => Ok(CallIdSpec::Explicit(*id)),
            CallIdEntry::Keyword(k) if k == "hash" => Ok(CallIdSpec::FromName),
            CallIdEntry::Keyword(k) => bail!("call_id must be an integer or \"hash\", found {k:?}"),
        }
    }
}

#[derive(Debug, Default)]
struct Source {
    path: Option<PathBuf>,
    text: String,
}

impl Source {
    fn location(&self, span: Range<usize>) -> Option<SourceLocation> {
        let path = self.path.as_ref()?;
        let before = &self.text[..span.start.min(self.text.len())];
        let line = before.matches('\n').count() + 1;
        let column = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
        Some(SourceLocation::new(
            path.display().to_string(),
            line as u32,
            column as u32,
        ))
    }
}

/// Parses manifest text. `path` is only used for diagnostics.
pub fn parse_manifest(text: &str, path: Option<&Path>) -> Result<Manifest> {
    let mut manifest: Manifest = toml::from_str(text).context("Failed to parse manifest")?;
    manifest.source = Source {
        path: path.map(Path::to_path_buf),
        text: text.to_string(),
    };
    Ok(manifest)
}

pub fn load_manifest<P: AsRef<Path>>(path: P) -> Result<Manifest> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to open manifest {}", path.display()))?;
    let manifest = parse_manifest(&text, Some(path))?;
    info!(
        path = %path.display(),
        modules = manifest.modules.len(),
        functions = manifest.functions.len(),
        "loaded manifest"
    );
    Ok(manifest)
}

impl Manifest {
    pub fn module_defs(&self) -> Result<Vec<GpuModuleDef>> {
        self.modules
            .iter()
            .map(|m| {
                let name = m.name.get_ref();
                if is_builtin_type(name) {
                    let at = self
                        .source
                        .location(m.name.span())
                        .map_or_else(String::new, |loc| format!("{loc}: "));
                    bail!("{at}module name `{name}` shadows a built-in type");
                }
                let mut def = GpuModuleDef::new(name.as_str(), m.file.as_str());
                def.gpu_config = m.config.clone();
                def.init_arg = m.init_arg;
                Ok(def)
            })
            .collect()
    }

    fn lifecycle(
        module: &str,
        which: &str,
        signature: Option<&String>,
        defs: &[GpuModuleDef],
    ) -> Result<Option<FunctionType>> {
        signature
            .map(|sig| {
                parse_signature(sig, defs)
                    .with_context(|| format!("in {which} of module `{module}`"))
            })
            .transpose()
    }

    fn function_decl(&self, entry: &FunctionEntry, defs: &[GpuModuleDef]) -> Result<FunctionDecl> {
        let name = entry.name.get_ref();
        let signature = parse_signature(&entry.signature, defs)
            .with_context(|| format!("in declaration of `{name}`"))?;
        let call_id = match &entry.call_id {
            Some(c) => c.spec().with_context(|| format!("in declaration of `{name}`"))?,
            None => CallIdSpec::None,
        };
        Ok(FunctionDecl {
            name: name.clone(),
            signature,
            call_id,
            location: self.source.location(entry.name.span()),
        })
    }

    /// Builds the module and free-function declarations this manifest describes.
    pub fn declarations(&self) -> Result<(Vec<ModuleDecl>, Vec<FunctionDecl>)> {
        let defs = self.module_defs()?;
        let mut modules = Vec::with_capacity(defs.len());
        for (entry, def) in self.modules.iter().zip(&defs) {
            let functions = entry
                .functions
                .iter()
                .map(|f| self.function_decl(f, &defs))
                .collect::<Result<Vec<_>>>()?;
            debug!(module = %def.name, functions = functions.len(), "parsed module declaration");
            modules.push(ModuleDecl {
                def: def.clone(),
                functions,
                constructor: Self::lifecycle(
                    &def.name,
                    "constructor",
                    entry.constructor.as_ref(),
                    &defs,
                )?,
                discard: Self::lifecycle(&def.name, "discard", entry.discard.as_ref(), &defs)?,
                location: self.source.location(entry.name.span()),
            });
        }
        let functions = self
            .functions
            .iter()
            .map(|f| self.function_decl(f, &defs))
            .collect::<Result<Vec<_>>>()?;
        Ok((modules, functions))
    }

    /// Registers every declaration into a fresh registry.
    pub fn into_registry(self) -> Result<Registry> {
        let mut registry = if self.documentation {
            Registry::documentation()
        } else {
            Registry::new()
        };
        let (modules, functions) = self.declarations()?;
        registry.register(modules, functions)?;
        Ok(registry)
    }
}
