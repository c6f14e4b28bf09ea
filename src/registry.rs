//! Generator registry.
//!
//! Code generators are looked up by name in a [`GeneratorRegistry`] value that
//! callers construct and pass around; there is no process-wide registry.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::model::ModelMap;

/// Renders a resolved model map.
pub trait Generator {
    /// Name the generator is registered under.
    fn name(&self) -> &str;

    fn generate(&self, models: &ModelMap, out: &mut dyn Write) -> io::Result<()>;
}

/// Named collection of generators.
#[derive(Default)]
pub struct GeneratorRegistry {
    generators: BTreeMap<String, Box<dyn Generator>>,
}

impl GeneratorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in `json` and `text` generators.
    pub fn with_builtins(pretty: bool) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(JsonGenerator { pretty }));
        registry.register(Box::new(TextGenerator));
        registry
    }

    /// Add a generator, replacing any previous one with the same name.
    pub fn register(&mut self, generator: Box<dyn Generator>) -> Option<Box<dyn Generator>> {
        self.generators
            .insert(generator.name().to_string(), generator)
    }

    pub fn get(&self, name: &str) -> Option<&dyn Generator> {
        self.generators.get(name).map(|generator| generator.as_ref())
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.generators.keys().map(String::as_str).collect()
    }
}

/// Writes the model map as JSON.
pub struct JsonGenerator {
    pub pretty: bool,
}

impl Generator for JsonGenerator {
    fn name(&self) -> &str {
        "json"
    }

    fn generate(&self, models: &ModelMap, out: &mut dyn Write) -> io::Result<()> {
        if self.pretty {
            serde_json::to_writer_pretty(&mut *out, models)?;
        } else {
            serde_json::to_writer(&mut *out, models)?;
        }
        writeln!(out)
    }
}

/// Writes one block per class, one `name: Type` line per property.
pub struct TextGenerator;

impl Generator for TextGenerator {
    fn name(&self) -> &str {
        "text"
    }

    fn generate(&self, models: &ModelMap, out: &mut dyn Write) -> io::Result<()> {
        for (index, (class_name, properties)) in models.iter().enumerate() {
            if index > 0 {
                writeln!(out)?;
            }
            writeln!(out, "{class_name}")?;
            for (name, resolved) in properties {
                writeln!(out, "  {name}: {resolved}")?;
            }
        }
        Ok(())
    }
}
