//! Source templates for the generated reactive code.

use crate::config::{MigrationConfig, simple_name};
use crate::syntax::Param;
use crate::syntax::types::mentions;

/// Inputs of one generated pipeline statement.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    /// Local holding the subscription handle.
    pub local: &'a str,
    pub work_method: &'a str,
    pub emitter: Option<&'a str>,
    /// Argument texts of the original trigger call.
    pub args: &'a [String],
    pub post_hook: Option<&'a str>,
    /// Lambda parameter receiving the produced value.
    pub result: &'a str,
    pub returns_void: bool,
}

/// Renders generated code for one configuration.
#[derive(Debug, Clone, Copy)]
pub struct Codegen<'c> {
    config: &'c MigrationConfig,
}

impl<'c> Codegen<'c> {
    pub fn new(config: &'c MigrationConfig) -> Self {
        Self { config }
    }

    fn ty(&self, fqn: &'c str) -> &'c str {
        simple_name(fqn)
    }

    pub fn aggregate_field(&self, name: &str) -> String {
        let ty = &self.config.aggregate_type;
        format!("private {ty} {name} = new {ty}();")
    }

    pub fn progress_subject(&self, emitter: &str, progress_type: &str) -> String {
        let subject = self.ty(&self.config.imports.subject);
        format!("{subject}<{progress_type}> {emitter} = {subject}.create();")
    }

    pub fn progress_subscription(&self, aggregate: &str, emitter: &str, hook: &str, value: &str) -> String {
        format!(
            "{aggregate}.add({emitter}.observeOn({}).subscribe({value} -> {hook}({value})));",
            self.config.result_scheduler
        )
    }

    pub fn hook_call(&self, method: &str) -> String {
        format!("{method}();")
    }

    /// Declares the subscription local for one trigger.
    pub fn pipeline(&self, p: &Pipeline<'_>) -> String {
        let args: Vec<&str> = p
            .emitter
            .into_iter()
            .chain(p.args.iter().map(String::as_str))
            .collect();
        let work = format!("{}({})", p.work_method, args.join(", "));
        let disposable = self.ty(&self.config.imports.disposable);

        let (source, consumer) = if p.returns_void {
            let consumer = match p.post_hook {
                Some(hook) => format!("() -> {hook}(null)"),
                None => "() -> { }".to_string(),
            };
            let completable = self.ty(&self.config.imports.completable);
            (format!("{completable}.fromAction(() -> {work})"), consumer)
        } else {
            let result = p.result;
            let consumer = match p.post_hook {
                Some(hook) => format!("{result} -> {hook}({result})"),
                None => format!("{result} -> {{ }}"),
            };
            let single = self.ty(&self.config.imports.single);
            (format!("{single}.fromCallable(() -> {work})"), consumer)
        };

        format!(
            "{disposable} {local} = {source}.subscribeOn({background}).observeOn({foreground}).subscribe({consumer});",
            local = p.local,
            background = self.config.background_scheduler,
            foreground = self.config.result_scheduler,
        )
    }

    pub fn add_to_aggregate(&self, aggregate: &str, local: &str) -> String {
        format!("{aggregate}.add({local});")
    }

    pub fn dispose_guard(&self, aggregate: &str) -> String {
        format!("if ({aggregate} != null && !{aggregate}.isDisposed()) {aggregate}.dispose();")
    }

    /// Full teardown override delegating to the superclass first.
    pub fn teardown_method(&self, aggregate: &str) -> String {
        let name = &self.config.teardown_method;
        format!(
            "@Override\nprotected void {name}() {{\nsuper.{name}();\n{}\n}}",
            self.dispose_guard(aggregate)
        )
    }

    pub fn emit(&self, emitter: &str, value: &str) -> String {
        format!("{emitter}.onNext({value})")
    }

    pub fn emitter_param(&self, emitter: &str, progress_type: &str) -> Param {
        let observer = self.ty(&self.config.imports.observer);
        Param::new(format!("{observer}<{progress_type}>"), emitter)
    }

    /// Reactive imports whose simple name appears in any generated text.
    pub fn required_imports<'t>(&self, texts: impl IntoIterator<Item = &'t str>) -> Vec<String> {
        let texts: Vec<&str> = texts.into_iter().collect();
        let imports = &self.config.imports;
        [
            &imports.single,
            &imports.completable,
            &imports.observer,
            &imports.schedulers,
            &imports.main_thread_schedulers,
            &imports.composite_disposable,
            &imports.disposable,
            &imports.subject,
        ]
        .into_iter()
        .filter(|fqn| {
            let name = simple_name(fqn);
            texts.iter().any(|t| mentions(t, name))
        })
        .cloned()
        .collect()
    }
}
