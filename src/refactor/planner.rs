//! Computes the edits that migrate one nested candidate.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::codegen::{Codegen, Pipeline};
use super::plan::{Edit, Fragment, MigrationPlan, Notice, PlanError};
use crate::config::MigrationConfig;
use crate::error::Result;
use crate::matcher::{Candidate, Variant};
use crate::naming::{NameCodec, PROGRESS_EMITTER, unique_name};
use crate::project::Project;
use crate::scope::{DeclRef, ReferenceFinder, ReferenceKind, SearchScope};
use crate::syntax::types::simple_type_name;
use crate::syntax::{NodeId, Piece, Placement, SyntaxTree, print_node};

/// Plans migrations. Reads the project, never writes it.
pub struct MigrationPlanner<'a> {
    config: &'a MigrationConfig,
    finder: &'a dyn ReferenceFinder,
}

/// One trigger call and the statement holding it.
struct Trigger {
    call: NodeId,
    statement: NodeId,
    method: NodeId,
}

/// Names of the migrated hook methods.
struct Hooks {
    work: String,
    progress: Option<String>,
    pre_start: Option<String>,
    post_result: Option<String>,
}

impl<'a> MigrationPlanner<'a> {
    pub fn new(config: &'a MigrationConfig, finder: &'a dyn ReferenceFinder) -> Self {
        Self { config, finder }
    }

    /// Plans the migration of `candidate` into `enclosing`.
    pub fn plan(&self, project: &Project, enclosing: NodeId, candidate: &Candidate) -> Result<MigrationPlan> {
        if candidate.variant != Variant::Nested {
            return Err(PlanError::NotNested {
                variant: candidate.variant,
            }
            .into());
        }
        let tree = project.require(&candidate.unit)?;
        let enclosing_name = tree
            .class(enclosing)
            .and_then(|c| c.name.clone())
            .filter(|_| candidate.enclosing == Some(enclosing))
            .ok_or(PlanError::MissingEnclosing)?;

        let aggregate_type = self.config.aggregate_type.as_str();
        if let Some(field) = tree
            .fields_of(enclosing)
            .into_iter()
            .filter_map(|f| tree.field(f))
            .find(|f| simple_type_name(&f.ty) == aggregate_type)
        {
            return Err(PlanError::AggregateAlreadyPresent {
                enclosing: enclosing_name,
                field: field.name.clone(),
            }
            .into());
        }

        let decl = candidate.decl;
        let work_hook = tree
            .find_method(decl, &self.config.required_hook)
            .filter(|m| tree.method(*m).is_some_and(|d| !d.is_constructor()))
            .ok_or_else(|| PlanError::MissingRequiredHook {
                expected: self.config.required_hook.clone(),
            })?;

        let codec = NameCodec::new(self.config);
        let task = candidate.task_name.as_str();
        let hook = |present: bool, name: &str| present.then(|| codec.migrated_method(task, name));
        let hooks = Hooks {
            work: codec.work_method(task),
            progress: hook(candidate.has_progress_hook, &self.config.hooks.progress_update),
            pre_start: hook(candidate.has_pre_start_hook, &self.config.hooks.pre_start),
            post_result: hook(candidate.has_post_result_hook, &self.config.hooks.post_result),
        };

        let mut planning = Planning {
            config: self.config,
            codegen: Codegen::new(self.config),
            tree,
            candidate,
            enclosing,
            enclosing_name,
            plan: MigrationPlan::new(&candidate.unit, &candidate.name, enclosing),
            generated: Vec::new(),
        };

        let aggregate = planning.aggregate();
        planning.relocate_fields();
        planning.extract_methods(&codec);
        let (triggers, holders) = self.triggers(project, tree, candidate, enclosing)?;
        let publishes = planning.publish_calls(work_hook, &hooks)?;
        planning.substitute_call_sites(&codec, &hooks, &aggregate, &triggers, holders);
        planning.wire_progress(work_hook, &publishes);
        planning.teardown(&aggregate);
        Ok(planning.finish())
    }

    /// Trigger calls for every use of the candidate, plus the holding
    /// variable declarations to delete afterwards.
    fn triggers(
        &self,
        project: &Project,
        tree: &SyntaxTree,
        candidate: &Candidate,
        enclosing: NodeId,
    ) -> Result<(Vec<Trigger>, Vec<NodeId>)> {
        let unit_scope = SearchScope::Unit(candidate.unit.clone());
        let references = self.finder.find_references(
            project,
            &DeclRef::new(&candidate.unit, candidate.decl),
            &unit_scope,
        )?;

        let mut triggers = Vec::new();
        let mut holders = Vec::new();
        for reference in references {
            let element = reference.element;
            match reference.kind {
                ReferenceKind::Type if self.holds_instance(tree, element, candidate) => continue,
                ReferenceKind::Instantiation => {}
                _ => return Err(unsupported(tree, element).into()),
            }

            let parent = tree.parent(element).ok_or_else(|| unsupported(tree, element))?;
            if let Some(var) = tree.var_decl(parent).filter(|v| v.init == Some(element)) {
                debug!(variable = %var.name, "instance held in local variable");
                let uses = self.finder.find_references(
                    project,
                    &DeclRef::new(&candidate.unit, parent),
                    &unit_scope,
                )?;
                for use_site in uses {
                    let call = tree
                        .parent(use_site.element)
                        .filter(|c| self.is_trigger(tree, *c, use_site.element))
                        .ok_or_else(|| unsupported(tree, use_site.element))?;
                    triggers.push(self.trigger(tree, call, candidate.decl, enclosing)?);
                }
                holders.push(parent);
            } else if self.is_trigger(tree, parent, element) {
                triggers.push(self.trigger(tree, parent, candidate.decl, enclosing)?);
            } else {
                return Err(unsupported(tree, element).into());
            }
        }
        Ok((triggers, holders))
    }

    /// True for a local declared with the candidate type and initialized by
    /// instantiating it; the instantiation reference covers that use.
    fn holds_instance(&self, tree: &SyntaxTree, element: NodeId, candidate: &Candidate) -> bool {
        tree.var_decl(element)
            .and_then(|v| v.init)
            .and_then(|init| tree.new_expr(init))
            .is_some_and(|new| new.body.is_none() && new.ty.is(&candidate.name))
    }

    fn is_trigger(&self, tree: &SyntaxTree, call: NodeId, receiver: NodeId) -> bool {
        tree.call(call)
            .is_some_and(|c| c.receiver == Some(receiver) && c.name == self.config.trigger_method)
    }

    fn trigger(&self, tree: &SyntaxTree, call: NodeId, decl: NodeId, enclosing: NodeId) -> Result<Trigger> {
        let statement = tree
            .parent(call)
            .filter(|s| is_call_statement(tree, *s, call))
            .filter(|s| tree.parent(*s).is_some_and(|b| tree.block(b).is_some()))
            .ok_or_else(|| PlanError::TriggerNotStatement {
                context: print_node(tree, tree.enclosing_statement(call).unwrap_or(call)),
            })?;
        if !tree.is_within(statement, enclosing) {
            return Err(PlanError::TriggerOutsideEnclosing.into());
        }
        if tree.is_within(statement, decl) {
            return Err(unsupported(tree, statement).into());
        }

        let method = tree
            .enclosing_method(statement)
            .ok_or_else(|| unsupported(tree, statement))?;
        let static_method = tree
            .ancestors(statement)
            .take_while(|a| *a != enclosing)
            .filter_map(|a| tree.method(a))
            .find(|m| m.modifiers.iter().any(|k| k == "static"));
        if let Some(m) = static_method {
            return Err(PlanError::StaticContext {
                method: m.name.clone(),
            }
            .into());
        }
        Ok(Trigger {
            call,
            statement,
            method,
        })
    }
}

/// Mutable planning state for one candidate.
struct Planning<'p> {
    config: &'p MigrationConfig,
    codegen: Codegen<'p>,
    tree: &'p SyntaxTree,
    candidate: &'p Candidate,
    enclosing: NodeId,
    enclosing_name: String,
    plan: MigrationPlan,
    /// Every generated text, for import resolution.
    generated: Vec<String>,
}

impl<'p> Planning<'p> {
    fn push(&mut self, edit: Edit) {
        self.plan.push(edit);
    }

    fn insert(&mut self, at: Placement, fragment: Fragment) {
        self.generated.push(fragment.text.clone());
        self.push(Edit::Insert { at, fragment });
    }

    /// Declares the aggregate field ahead of the enclosing class's fields.
    fn aggregate(&mut self) -> String {
        let tree = self.tree;
        let fields = tree.fields_of(self.enclosing);
        let name = unique_name(&self.config.aggregate_field, |n| {
            fields.iter().any(|f| tree.field(*f).is_some_and(|d| d.name == n))
        });
        let at = match fields.first() {
            Some(first) => Placement::Before(*first),
            None => Placement::Start(self.enclosing),
        };
        let text = self.codegen.aggregate_field(&name);
        self.insert(at, Fragment::member(text));
        name
    }

    fn relocate_fields(&mut self) {
        let decl = self.candidate.decl;
        for field in self.tree.fields_of(decl) {
            self.push(Edit::MoveMember {
                member: field,
                to: Placement::Before(decl),
            });
        }
    }

    fn extract_methods(&mut self, codec: &NameCodec<'_>) {
        let tree = self.tree;
        let decl = self.candidate.decl;
        let methods: Vec<NodeId> = tree
            .methods_of(decl)
            .into_iter()
            .filter(|m| tree.method(*m).is_some_and(|d| !d.is_constructor()))
            .collect();

        let mut renames = HashMap::new();
        let mut previous = None;
        for method in &methods {
            let Some(original) = tree.method(*method).map(|m| m.name.clone()) else {
                continue;
            };
            let name = codec.migrated_method(&self.candidate.task_name, &original);
            self.push(Edit::StripModifier {
                member: *method,
                replacement: Some("private".to_string()),
            });
            if name != original {
                self.push(Edit::RenameMember {
                    member: *method,
                    name: name.clone(),
                });
            }
            let to = match previous {
                Some(prev) => Placement::After(prev),
                None => Placement::Start(self.enclosing),
            };
            self.push(Edit::MoveMember {
                member: *method,
                to,
            });
            self.push(Edit::RemoveAnnotation {
                member: *method,
                name: "Override".to_string(),
            });
            previous = Some(*method);
            renames.insert(original, name);
        }

        // Calls between the candidate's own methods follow the renames.
        for id in tree.descendants(decl) {
            let Some(call) = tree.call(id) else {
                continue;
            };
            let on_self = call.receiver.is_none_or(|r| print_node(tree, r) == "this");
            let renamed = renames.get(&call.name).filter(|n| **n != call.name);
            if let (true, Some(name)) = (on_self, renamed) {
                let name = name.clone();
                self.push(Edit::RenameCall { call: id, name });
            }
        }
    }

    /// Publish calls inside the candidate, checked against the progress
    /// preconditions.
    fn publish_calls(&self, work_hook: NodeId, hooks: &Hooks) -> Result<Vec<NodeId>> {
        let tree = self.tree;
        let publishes: Vec<NodeId> = tree
            .descendants(self.candidate.decl)
            .into_iter()
            .filter(|id| {
                tree.call(*id).is_some_and(|c| {
                    c.name == self.config.progress_publish
                        && c.receiver.is_none_or(|r| print_node(tree, r) == "this")
                })
            })
            .collect();

        if !publishes.is_empty() && hooks.progress.is_none() {
            return Err(PlanError::PublishWithoutProgressHook.into());
        }
        for publish in &publishes {
            if !tree.is_within(*publish, work_hook) {
                let method = tree
                    .enclosing_method(*publish)
                    .and_then(|m| tree.method(m))
                    .map(|m| m.name.clone())
                    .unwrap_or_default();
                return Err(PlanError::PublishOutsideWorkHook { method }.into());
            }
            let args = tree.call(*publish).map(|c| c.args.len()).unwrap_or_default();
            if args != 1 {
                return Err(PlanError::PublishArity { args }.into());
            }
        }
        Ok(publishes)
    }

    fn substitute_call_sites(
        &mut self,
        codec: &NameCodec<'_>,
        hooks: &Hooks,
        aggregate: &str,
        triggers: &[Trigger],
        holders: Vec<NodeId>,
    ) {
        let tree = self.tree;
        let task = self.candidate.task_name.clone();
        let mut taken: HashMap<NodeId, HashSet<String>> = HashMap::new();

        for trigger in triggers {
            let names = taken
                .entry(trigger.method)
                .or_insert_with(|| names_in(tree, trigger.method));
            let emitter = hooks.progress.as_ref().map(|_| {
                let name = unique_name(PROGRESS_EMITTER, |n| names.contains(n));
                names.insert(name.clone());
                name
            });
            let local = unique_name(&codec.disposable_local(&task), |n| names.contains(n));
            names.insert(local.clone());
            let result = unique_name("result", |n| names.contains(n));
            let value = unique_name("value", |n| names.contains(n));

            let statement = trigger.statement;
            if let (Some(emitter), Some(progress)) = (&emitter, &hooks.progress) {
                let subject = self
                    .codegen
                    .progress_subject(emitter, &self.candidate.progress_type);
                let subscription = self
                    .codegen
                    .progress_subscription(aggregate, emitter, progress, &value);
                self.insert(Placement::Before(statement), Fragment::statement(subject));
                self.insert(Placement::Before(statement), Fragment::statement(subscription));
            }
            if let Some(pre_start) = &hooks.pre_start {
                let call = self.codegen.hook_call(pre_start);
                self.insert(Placement::Before(statement), Fragment::statement(call));
            }

            let args: Vec<String> = tree
                .call(trigger.call)
                .map(|c| c.args.iter().map(|a| print_node(tree, *a)).collect())
                .unwrap_or_default();
            let pipeline = self.codegen.pipeline(&Pipeline {
                local: &local,
                work_method: &hooks.work,
                emitter: emitter.as_deref(),
                args: &args,
                post_hook: hooks.post_result.as_deref(),
                result: &result,
                returns_void: self.candidate.returns_void(),
            });
            self.generated.push(pipeline.clone());
            self.push(Edit::ReplaceNode {
                target: statement,
                with: Fragment::statement(pipeline),
            });
            let add = self.codegen.add_to_aggregate(aggregate, &local);
            self.insert(Placement::After(statement), Fragment::statement(add));
        }

        for holder in holders {
            self.push(Edit::DeleteNode { target: holder });
        }
    }

    fn wire_progress(&mut self, work_hook: NodeId, publishes: &[NodeId]) {
        if self.candidate.has_progress_hook {
            let param = self
                .codegen
                .emitter_param(PROGRESS_EMITTER, &self.candidate.progress_type);
            self.generated.push(param.text.clone());
            self.push(Edit::AddParameter {
                method: work_hook,
                index: 0,
                param,
            });
        }
        for publish in publishes {
            let Some(value) = self
                .tree
                .call(*publish)
                .and_then(|c| c.args.first())
                .map(|a| print_node(self.tree, *a))
            else {
                continue;
            };
            let text = self.codegen.emit(PROGRESS_EMITTER, &value);
            self.push(Edit::ReplaceNode {
                target: *publish,
                with: Fragment::expression(text),
            });
        }
    }

    fn teardown(&mut self, aggregate: &str) {
        let tree = self.tree;
        let existing = tree
            .find_method(self.enclosing, &self.config.teardown_method)
            .filter(|m| {
                tree.method(*m)
                    .is_some_and(|d| !d.is_constructor() && d.params.is_empty())
            });

        if let Some(method) = existing {
            let last = tree
                .method(method)
                .and_then(|m| m.body)
                .and_then(|b| tree.block(b))
                .and_then(|b| b.statements.last().copied());
            let at = match last {
                Some(statement) => Placement::Before(statement),
                None => Placement::End(method),
            };
            let guard = self.codegen.dispose_guard(aggregate);
            self.insert(at, Fragment::statement(guard));
            return;
        }

        let hosts_lifecycle = tree
            .class(self.enclosing)
            .and_then(|c| c.supertype.as_ref())
            .is_some_and(|s| s.text.contains(&self.config.host_lifecycle_marker));
        if hosts_lifecycle {
            let method = self.codegen.teardown_method(aggregate);
            self.insert(Placement::End(self.enclosing), Fragment::member(method));
            return;
        }

        let notice = Notice::TeardownNotSynthesized {
            enclosing: self.enclosing_name.clone(),
        };
        warn!(unit = %self.candidate.unit.display(), "{notice}");
        self.plan.notices.push(notice);
    }

    fn finish(mut self) -> MigrationPlan {
        self.push(Edit::DeleteNode {
            target: self.candidate.decl,
        });
        let add = self
            .codegen
            .required_imports(self.generated.iter().map(String::as_str));
        self.push(Edit::NormalizeImports {
            add,
            drop_unused: vec![self.config.marker_import.clone()],
        });
        debug!(
            candidate = %self.candidate.name,
            edits = self.plan.len(),
            "planned migration"
        );
        self.plan
    }
}

/// True when `statement` is exactly `call;`.
fn is_call_statement(tree: &SyntaxTree, statement: NodeId, call: NodeId) -> bool {
    let Some(opaque) = tree.opaque(statement) else {
        return false;
    };
    opaque.nodes().eq(std::iter::once(call))
        && opaque.pieces.iter().all(|p| match p {
            Piece::Text(t) => matches!(t.trim(), "" | ";"),
            Piece::Node(_) => true,
        })
}

/// Every name declared or mentioned inside a method.
fn names_in(tree: &SyntaxTree, method: NodeId) -> HashSet<String> {
    let mut names: HashSet<String> = tree
        .method(method)
        .map(|m| m.params.iter().map(|p| p.name.clone()).collect())
        .unwrap_or_default();
    for id in tree.descendants(method) {
        if let Some(var) = tree.var_decl(id) {
            names.insert(var.name.clone());
        }
        if let Some(name) = tree.name_ref(id) {
            names.insert(name.name.clone());
        }
    }
    names
}

fn unsupported(tree: &SyntaxTree, element: NodeId) -> PlanError {
    let context = tree.enclosing_statement(element).unwrap_or(element);
    PlanError::UnsupportedUse {
        context: print_node(tree, context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use crate::matcher::PatternMatcher;
    use crate::scope::NameResolver;
    use crate::syntax::parse;
    use std::path::Path;

    fn project(source: &str) -> Project {
        let mut project = Project::new();
        project.insert(parse(Path::new("Loader.java"), source).unwrap());
        project
    }

    fn plan(source: &str) -> Result<MigrationPlan> {
        let config = MigrationConfig::default();
        let project = project(source);
        let tree = project.require(Path::new("Loader.java")).unwrap();
        let candidate = PatternMatcher::new(&config).discover(tree).remove(0);
        MigrationPlanner::new(&config, &NameResolver).plan(
            &project,
            candidate.enclosing.unwrap(),
            &candidate,
        )
    }

    const LOADER: &str = r#"
class Loader {
    void start(String url) {
        Download task = new Download();
        task.execute(url);
    }

    class Download extends AsyncTask<String, Integer, String> {
        @Override
        protected String doInBackground(String... urls) {
            publishProgress(50);
            return urls[0];
        }

        @Override
        protected void onProgressUpdate(Integer... values) {}
    }
}
"#;

    fn labels(plan: &MigrationPlan) -> Vec<&'static str> {
        plan.edits.iter().map(Edit::label).collect()
    }

    #[test]
    fn test_plans_nested_candidate_in_order() {
        let plan = plan(LOADER).unwrap();
        assert_eq!(
            labels(&plan),
            vec![
                "insert-before",
                "strip-modifier",
                "rename-member",
                "move-member",
                "remove-annotation",
                "strip-modifier",
                "rename-member",
                "move-member",
                "remove-annotation",
                "insert-before",
                "insert-before",
                "replace-node",
                "insert-after",
                "delete-node",
                "add-parameter",
                "replace-node",
                "delete-node",
                "normalize-imports",
            ]
        );
        assert_eq!(
            plan.notices,
            vec![Notice::TeardownNotSynthesized {
                enclosing: "Loader".to_string()
            }]
        );
    }

    #[test]
    fn test_renames_hooks_from_task_name() {
        let plan = plan(LOADER).unwrap();
        let renamed: Vec<&str> = plan
            .edits
            .iter()
            .filter_map(|e| match e {
                Edit::RenameMember { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(renamed, vec!["doDownload", "downloadProgressUpdate"]);
    }

    #[test]
    fn test_pipeline_passes_emitter_then_arguments() {
        let plan = plan(LOADER).unwrap();
        let pipeline = plan
            .edits
            .iter()
            .find_map(|e| match e {
                Edit::ReplaceNode { with, .. } if with.text.starts_with("Disposable") => {
                    Some(with.text.clone())
                }
                _ => None,
            })
            .unwrap();
        assert!(pipeline.contains("doDownload(progressEmitter, url)"));
    }

    #[test]
    fn test_rejects_use_outside_trigger_patterns() {
        let source = LOADER.replace("task.execute(url);", "task.execute(url);\n        log(task);");
        let err = plan(&source).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Plan(PlanError::UnsupportedUse { .. })
        ));
    }

    #[test]
    fn test_rejects_trigger_in_static_method() {
        let source = LOADER.replace("void start(String url)", "static void start(String url)");
        let err = plan(&source).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Plan(PlanError::StaticContext { .. })
        ));
    }

    #[test]
    fn test_rejects_publish_outside_work_hook() {
        let source = LOADER.replace(
            "protected void onProgressUpdate(Integer... values) {}",
            "protected void onProgressUpdate(Integer... values) { publishProgress(1); }",
        );
        let err = plan(&source).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Plan(PlanError::PublishOutsideWorkHook { .. })
        ));
    }

    #[test]
    fn test_skips_enclosing_that_already_has_aggregate() {
        let source = LOADER.replace(
            "class Loader {",
            "class Loader {\n    private CompositeDisposable disposables = new CompositeDisposable();",
        );
        let MigrationError::Plan(err) = plan(&source).unwrap_err() else {
            panic!("expected a planning precondition");
        };
        assert_eq!(
            err,
            PlanError::AggregateAlreadyPresent {
                enclosing: "Loader".to_string(),
                field: "disposables".to_string()
            }
        );
        assert_eq!(err.to_string(), "Loader already declares aggregate field 'disposables'");
    }

    #[test]
    fn test_synthesizes_teardown_for_lifecycle_host() {
        let source = LOADER.replace("class Loader {", "class Loader extends AppCompatActivity {");
        let plan = plan(&source).unwrap();
        assert!(plan.notices.is_empty());
        let teardown = plan.edits.iter().any(|e| {
            matches!(e, Edit::Insert { fragment, .. } if fragment.text.contains("super.onDestroy();"))
        });
        assert!(teardown);
    }

    #[test]
    fn test_guards_existing_teardown_before_last_statement() {
        let source = LOADER.replace(
            "    class Download",
            "    protected void onDestroy() {\n        close();\n        super.onDestroy();\n    }\n\n    class Download",
        );
        let plan = plan(&source).unwrap();
        let guard = plan
            .edits
            .iter()
            .find(|e| matches!(e, Edit::Insert { fragment, .. } if fragment.text.starts_with("if (compositeDisposable")));
        assert!(matches!(guard, Some(Edit::Insert { at: Placement::Before(_), .. })));
    }
}
