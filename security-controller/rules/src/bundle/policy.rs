use super::{Definition, LoadError};
use anyhow::{anyhow, bail, Context as _, Result};
use security_controller_core::{
    ClusterRule, PlanRule, Rule, RuleResult, ScanContext, Status, TargetKind,
};
use security_controller_k8s_api::{Cluster, Plan};
use serde_json::Value;
use std::fmt;

/// The package every policy program must declare, and the query evaluated
/// against it.
pub const QUERY: &str = "data.security";
const PACKAGE: &str = "security";

/// A rule backed by a compiled Rego program.
///
/// The program is evaluated with the target resource as `input`. Its package
/// must evaluate to an object with:
///
/// - `message`: a string describing the check;
/// - `plan` / `cluster`: the violations found for that kind of target, as an
///   array or set of strings. Absent or empty means compliant;
/// - `applies` (optional): `false` when the rule does not apply to the
///   target.
#[derive(Clone)]
pub struct PolicyRule {
    name: String,
    code: String,
    description: String,
    status: Status,
    engine: regorus::Engine,
}

fn rego_error(error: impl fmt::Display) -> anyhow::Error {
    anyhow!("{error:#}")
}

// === impl PolicyRule ===

impl PolicyRule {
    pub(super) fn compile(bundle: &str, definition: Definition) -> Result<Self, LoadError> {
        let Definition {
            name,
            code,
            description,
            status,
            rule,
        } = definition;

        for (field, value) in [("code", &code), ("name", &name), ("rule", &rule)] {
            if value.trim().is_empty() {
                return Err(LoadError::Empty {
                    bundle: bundle.to_string(),
                    field,
                });
            }
        }

        let status = status
            .parse::<Status>()
            .map_err(|source| LoadError::Severity {
                bundle: bundle.to_string(),
                code: code.clone(),
                source,
            })?;

        let compile_error = |message: String| LoadError::Compile {
            bundle: bundle.to_string(),
            code: code.clone(),
            message,
        };
        let mut engine = regorus::Engine::new();
        let package = engine
            .add_policy(format!("{bundle}/{code}.rego"), rule)
            .map_err(|error| compile_error(format!("{error:#}")))?;
        if package.trim_start_matches("data.") != PACKAGE {
            return Err(compile_error(format!(
                "expected `package {PACKAGE}`, found `package {}`",
                package.trim_start_matches("data.")
            )));
        }

        // Analysis runs on first evaluation. Do it here so that unsafe
        // variables and unknown functions fail the load, and clones start
        // prepared.
        engine.set_input(regorus::Value::new_object());
        engine
            .eval_query(QUERY.to_string(), false)
            .map_err(|error| compile_error(format!("{error:#}")))?;

        Ok(Self {
            name,
            code,
            description,
            status,
            engine,
        })
    }

    /// The status reported when the program finds a violation.
    pub fn status(&self) -> Status {
        self.status
    }

    async fn evaluate(&self, ctx: &ScanContext<'_>) -> Result<Option<RuleResult>> {
        let input = regorus::Value::from_json_str(&ctx.snapshot().to_string())
            .map_err(rego_error)
            .context("failed to convert target to policy input")?;

        // The compiled engine is shared; each evaluation works on its own copy.
        // A cancelled or timed-out evaluation keeps its blocking thread until
        // the program finishes.
        let mut engine = self.engine.clone();
        let eval = tokio::task::spawn_blocking(move || -> Result<Value> {
            engine.set_input(input);
            let results = engine
                .eval_query(QUERY.to_string(), false)
                .map_err(rego_error)?;
            let value = results
                .result
                .into_iter()
                .next()
                .and_then(|result| result.expressions.into_iter().next())
                .map(|expression| expression.value)
                .ok_or_else(|| anyhow!("policy produced no result for {QUERY}"))?;
            let json = value.to_json_str().map_err(rego_error)?;
            Ok(serde_json::from_str(&json)?)
        });

        let output = tokio::select! {
            biased;
            () = ctx.cancelled() => bail!("policy evaluation cancelled"),
            res = eval => res.context("policy evaluation panicked")??,
        };

        interpret(&self.code, self.status, ctx.kind(), &output)
            .with_context(|| format!("policy {} returned an unexpected result", self.code))
    }
}

impl fmt::Debug for PolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PolicyRule")
            .field("code", &self.code)
            .field("name", &self.name)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Rule for PolicyRule {
    fn code(&self) -> &str {
        &self.code
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn as_plan_rule(&self) -> Option<&dyn PlanRule> {
        Some(self)
    }

    fn as_cluster_rule(&self) -> Option<&dyn ClusterRule> {
        Some(self)
    }
}

#[async_trait::async_trait]
impl PlanRule for PolicyRule {
    async fn check_plan(&self, ctx: &ScanContext<'_>, _: &Plan) -> Result<Option<RuleResult>> {
        self.evaluate(ctx).await
    }
}

#[async_trait::async_trait]
impl ClusterRule for PolicyRule {
    async fn check_cluster(
        &self,
        ctx: &ScanContext<'_>,
        _: &Cluster,
    ) -> Result<Option<RuleResult>> {
        self.evaluate(ctx).await
    }
}

/// Turns a program's output into a rule result. Violations are read from the
/// key matching the runtime kind of the target.
pub(crate) fn interpret(
    code: &str,
    status: Status,
    kind: TargetKind,
    output: &Value,
) -> Result<Option<RuleResult>> {
    let Some(output) = output.as_object() else {
        bail!(
            "expected an object, found {}",
            crate::config::type_name(output)
        );
    };

    match output.get("applies") {
        None | Some(Value::Bool(true)) => {}
        Some(Value::Bool(false)) => return Ok(None),
        Some(other) => bail!(
            "`applies` must be a boolean, found {}",
            crate::config::type_name(other)
        ),
    }

    let message = match output.get("message") {
        Some(Value::String(message)) => message,
        Some(other) => bail!(
            "`message` must be a string, found {}",
            crate::config::type_name(other)
        ),
        None => bail!("missing `message`"),
    };

    let violations = match output.get(kind.as_str()) {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(violations)) => violations.as_slice(),
        Some(other) => bail!(
            "`{kind}` must be an array, found {}",
            crate::config::type_name(other)
        ),
    };
    if violations.is_empty() {
        return Ok(Some(RuleResult::compliant(code, message)));
    }

    let mut reasons = violations
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>();
    reasons.sort_unstable();
    reasons.dedup();
    let message = if reasons.is_empty() {
        message.clone()
    } else {
        reasons.join("; ")
    };
    Ok(Some(RuleResult::new(code, status, message)))
}
