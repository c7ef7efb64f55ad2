//! Plugin registry.
//!
//! Synthesis units are opaque to the engine core. A plugin library is a
//! named collection of factories, each addressed by a URI; libraries are
//! loaded into a [`PluginRegistry`] once, when the engine is configured.
//! Requests consult the registry to validate synth construction and port
//! mapping before anything is encoded.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::metadata::{ControlSpec, MetaData, UiNode};
use crate::value::Value;

/// URI prefix of the bundled plugin descriptors.
pub const PLUGINS_URI: &str = "urn:ostinato:plugins";

/// Static description of a synth definition.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthDef {
    pub uri: String,
    pub control_inputs: Vec<ControlSpec>,
    pub audio_inputs: u32,
    pub audio_outputs: u32,
    pub metadata: MetaData,
    /// Optional editor layout over the control inputs.
    pub ui: Option<UiNode>,
}

impl SynthDef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            control_inputs: Vec::new(),
            audio_inputs: 0,
            audio_outputs: 0,
            metadata: MetaData::new(),
            ui: None,
        }
    }

    pub fn control(mut self, spec: ControlSpec) -> Self {
        self.control_inputs.push(spec);
        self
    }

    pub fn audio_inputs(mut self, count: u32) -> Self {
        self.audio_inputs = count;
        self
    }

    pub fn audio_outputs(mut self, count: u32) -> Self {
        self.audio_outputs = count;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    pub fn ui(mut self, ui: UiNode) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn num_controls(&self) -> usize {
        self.control_inputs.len()
    }

    /// Look up a control input by name.
    pub fn control_index(&self, name: &str) -> Option<u32> {
        self.control_inputs
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.index)
    }
}

/// Factory for one kind of synthesis unit.
pub trait SynthFactory: Send + Sync {
    fn definition(&self) -> &SynthDef;

    /// Check construction options before they are sent.
    fn validate_options(&self, _options: &[Value]) -> Result<()> {
        Ok(())
    }
}

/// Factory that only carries a definition.
#[derive(Debug, Clone)]
pub struct DefinitionFactory {
    def: SynthDef,
}

impl DefinitionFactory {
    pub fn new(def: SynthDef) -> Self {
        Self { def }
    }
}

impl SynthFactory for DefinitionFactory {
    fn definition(&self) -> &SynthDef {
        &self.def
    }
}

/// Named set of factories.
#[derive(Clone)]
pub struct PluginLibrary {
    name: String,
    factories: Vec<Arc<dyn SynthFactory>>,
}

impl PluginLibrary {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            factories: Vec::new(),
        }
    }

    pub fn with_factory(mut self, factory: impl SynthFactory + 'static) -> Self {
        self.factories.push(Arc::new(factory));
        self
    }

    pub fn with_definition(self, def: SynthDef) -> Self {
        self.with_factory(DefinitionFactory::new(def))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a factory by URI.
    pub fn lookup(&self, uri: &str) -> Option<&Arc<dyn SynthFactory>> {
        self.factories.iter().find(|f| f.definition().uri == uri)
    }
}

impl fmt::Debug for PluginLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uris: Vec<_> = self.factories.iter().map(|f| &f.definition().uri).collect();
        f.debug_struct("PluginLibrary")
            .field("name", &self.name)
            .field("factories", &uris)
            .finish()
    }
}

/// URI → factory map built at engine configuration time.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    libraries: Vec<String>,
    factories: HashMap<String, Arc<dyn SynthFactory>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every factory of a library. Later registrations of a URI
    /// replace earlier ones.
    pub fn load(&mut self, library: &PluginLibrary) {
        for factory in &library.factories {
            let def = factory.definition();
            let uri = def.uri.clone();
            if let Some(ui) = &def.ui {
                let count = def.num_controls() as u32;
                if let Some(bad) = ui.controls().into_iter().find(|&c| c >= count) {
                    tracing::warn!(%uri, control = bad, controls = count, "UI refers to a missing control");
                }
            }
            if self.factories.insert(uri.clone(), Arc::clone(factory)).is_some() {
                tracing::warn!(%uri, library = library.name(), "plugin URI registered twice");
            }
        }
        tracing::debug!(
            library = library.name(),
            count = library.factories.len(),
            "loaded plugin library"
        );
        self.libraries.push(library.name.clone());
    }

    pub fn with_library(mut self, library: &PluginLibrary) -> Self {
        self.load(library);
        self
    }

    pub fn get(&self, uri: &str) -> Result<&Arc<dyn SynthFactory>> {
        self.factories
            .get(uri)
            .ok_or_else(|| Error::UnknownPlugin(uri.to_string()))
    }

    pub fn definition(&self, uri: &str) -> Result<&SynthDef> {
        self.get(uri).map(|f| f.definition())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.factories.contains_key(uri)
    }

    /// Names of the loaded libraries in load order.
    pub fn library_names(&self) -> &[String] {
        &self.libraries
    }

    pub fn uris(&self) -> Vec<&str> {
        let mut uris: Vec<_> = self.factories.keys().map(String::as_str).collect();
        uris.sort_unstable();
        uris
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("libraries", &self.libraries)
            .field("uris", &self.uris())
            .finish()
    }
}

/// Descriptor for the patch cable: one audio input copied to one output.
pub fn patch_cable() -> PluginLibrary {
    PluginLibrary::new("patch-cable").with_definition(
        SynthDef::new(format!("{}/patch-cable", PLUGINS_URI))
            .audio_inputs(1)
            .audio_outputs(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StrictFactory(SynthDef);

    impl SynthFactory for StrictFactory {
        fn definition(&self) -> &SynthDef {
            &self.0
        }

        fn validate_options(&self, options: &[Value]) -> Result<()> {
            match options.first() {
                Some(Value::String(_)) => Ok(()),
                _ => Err(Error::InvalidCommand("path required".into())),
            }
        }
    }

    #[test]
    fn test_registry_lookup() {
        let registry = PluginRegistry::new().with_library(&patch_cable());
        let uri = format!("{}/patch-cable", PLUGINS_URI);

        assert!(registry.contains(&uri));
        assert_eq!(registry.definition(&uri).unwrap().audio_outputs, 1);
        assert_eq!(registry.library_names(), &["patch-cable".to_string()]);
        assert!(matches!(
            registry.get("urn:missing"),
            Err(Error::UnknownPlugin(_))
        ));
    }

    #[test]
    fn test_custom_validation() {
        let lib = PluginLibrary::new("strict")
            .with_factory(StrictFactory(SynthDef::new("urn:strict").audio_outputs(2)));
        let registry = PluginRegistry::new().with_library(&lib);
        let factory = registry.get("urn:strict").unwrap();

        assert!(factory.validate_options(&[Value::from("a.wav")]).is_ok());
        assert!(factory.validate_options(&[Value::Int(1)]).is_err());
        assert!(lib.lookup("urn:strict").is_some());
    }
}
