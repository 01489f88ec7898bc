//! JS compiler and CSS minifier capabilities.
//!
//! The assembler only sees the [`JsCompiler`] and [`CssMinifier`] traits, so
//! tests can swap in stubs. [`OxcCompiler`] and [`LightningMinifier`] are the
//! production implementations; [`Passthrough`] returns its input unchanged.

use lightningcss::printer::PrinterOptions;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, StyleSheet};
use oxc_allocator::Allocator;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_minifier::{Minifier, MinifierOptions};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::fmt;

/// Messages reported by a failed compile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileDiagnostics {
    pub messages: Vec<String>,
}

impl CompileDiagnostics {
    pub fn new(messages: Vec<String>) -> Self {
        Self { messages }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self {
            messages: vec![message.into()],
        }
    }
}

impl fmt::Display for CompileDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.messages.as_slice() {
            [] => f.write_str("unknown error"),
            [one] => f.write_str(one),
            many => write!(f, "{} errors: {}", many.len(), many.join("; ")),
        }
    }
}

/// Whole-program JavaScript optimizer.
pub trait JsCompiler: Send + Sync + fmt::Debug {
    fn compile(&self, source: &str) -> Result<String, CompileDiagnostics>;
}

/// Stylesheet minifier.
pub trait CssMinifier: Send + Sync + fmt::Debug {
    fn minify(&self, source: &str) -> Result<String, CompileDiagnostics>;
}

/// Parse, compress, mangle and print with oxc.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcCompiler;

impl JsCompiler for OxcCompiler {
    fn compile(&self, source: &str) -> Result<String, CompileDiagnostics> {
        let allocator = Allocator::default();
        let ret = Parser::new(&allocator, source, SourceType::cjs()).parse();

        if ret.panicked || !ret.errors.is_empty() {
            let messages = ret.errors.iter().map(|e| e.to_string()).collect();
            return Err(CompileDiagnostics::new(messages));
        }

        let mut program = ret.program;
        let minified = Minifier::new(MinifierOptions::default()).minify(&allocator, &mut program);

        let output = Codegen::new()
            .with_options(CodegenOptions::minify())
            .with_scoping(minified.scoping)
            .build(&program);
        Ok(output.code)
    }
}

/// lightningcss minify pass plus compressed printing.
#[derive(Debug, Default, Clone, Copy)]
pub struct LightningMinifier;

impl CssMinifier for LightningMinifier {
    fn minify(&self, source: &str) -> Result<String, CompileDiagnostics> {
        let mut stylesheet = StyleSheet::parse(source, ParserOptions::default())
            .map_err(|e| CompileDiagnostics::single(e.to_string()))?;

        stylesheet
            .minify(MinifyOptions::default())
            .map_err(|e| CompileDiagnostics::single(e.to_string()))?;

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify: true,
                ..PrinterOptions::default()
            })
            .map_err(|e| CompileDiagnostics::single(e.to_string()))?;
        Ok(printed.code)
    }
}

/// Returns sources unchanged; used when minification is off.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl JsCompiler for Passthrough {
    fn compile(&self, source: &str) -> Result<String, CompileDiagnostics> {
        Ok(source.to_string())
    }
}

impl CssMinifier for Passthrough {
    fn minify(&self, source: &str) -> Result<String, CompileDiagnostics> {
        Ok(source.to_string())
    }
}
