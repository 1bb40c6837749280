//! Test invocations and the fixed QuickJS acceptance plan.

use serde::{Deserialize, Serialize};

/// One configured unit of test execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestInvocation {
    /// Display name, defaults to `"<executable> <args>"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    /// Group label used for filtering (e.g. "test262")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Executable identifier, resolved against the native directory
    pub executable: String,
    /// Argument string, split on whitespace at launch
    #[serde(default)]
    pub args: String,
}

impl TestInvocation {
    pub fn new(executable: &str, args: &str) -> Self {
        Self {
            name: None,
            group: None,
            executable: executable.to_string(),
            args: args.to_string(),
        }
    }

    pub fn named(name: &str, executable: &str, args: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Self::new(executable, args)
        }
    }

    pub fn in_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    pub fn name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None if self.args.is_empty() => self.executable.clone(),
            None => format!("{} {}", self.executable, self.args),
        }
    }
}

/// Ordered list of invocations, executed strictly one after another.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPlan {
    invocations: Vec<TestInvocation>,
}

impl TestPlan {
    pub fn new(invocations: Vec<TestInvocation>) -> Self {
        Self { invocations }
    }

    /// The QuickJS acceptance suite: compiler smoke tests, the unit test
    /// scripts for both interpreters, stats, benchmarks and test262.
    pub fn quickjs() -> Self {
        let mut invocations = Vec::new();
        let mut add = |group: &str, executable: &str, args: &str| {
            invocations.push(TestInvocation::new(executable, args).in_group(group));
        };

        add("js2c", "qjsc", "-c -o repl.c -m repl.js");
        add("js2c", "qjsbnc", "-c -o repl-bn.c -m repl.js");
        add("js2c", "qjsbnc", "-c -o qjscalc.c qjscalc.js");

        for interpreter in ["qjs", "qjsbn"] {
            for script in [
                "tests/test_closure.js",
                "tests/test_op.js",
                "tests/test_builtin.js",
                "tests/test_loop.js",
                "tests/test_std.js",
            ] {
                add("test", interpreter, script);
            }
        }
        add("test", "qjsbn", "--qjscalc tests/test_bignum.js");

        add("stats", "qjs", "-qd");
        add("microbench", "qjs", "--std tests/microbench.js");

        for args in [
            "-m -c test262o.conf",
            "-u -c test262o.conf",
            "-m -c test262.conf",
            "-m -c test262.conf -a",
            "-u -c test262.conf -a",
            "-m -c test262.conf -E -a",
        ] {
            add("test262", "run-test262", args);
        }
        for args in ["-m -c test262bn.conf", "-m -c test262bn.conf -a"] {
            add("test262bn", "run-test262-bn", args);
        }

        add("bench-v8", "qjs", "-d tests/bench-v8/combined.js");

        Self { invocations }
    }

    /// Keep only invocations whose group is listed, preserving order.
    /// An empty filter keeps everything.
    pub fn filter_groups<S: AsRef<str>>(&self, groups: &[S]) -> TestPlan {
        if groups.is_empty() {
            return self.clone();
        }
        let invocations = self
            .invocations
            .iter()
            .filter(|inv| {
                inv.group
                    .as_deref()
                    .is_some_and(|g| groups.iter().any(|wanted| wanted.as_ref() == g))
            })
            .cloned()
            .collect();
        TestPlan { invocations }
    }

    /// Distinct executable identifiers, in first-use order.
    pub fn executables(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for inv in &self.invocations {
            if !seen.contains(&inv.executable) {
                seen.push(inv.executable.clone());
            }
        }
        seen
    }

    /// Distinct group labels, in first-use order.
    pub fn groups(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for group in self.invocations.iter().filter_map(|inv| inv.group.as_ref()) {
            if !seen.contains(group) {
                seen.push(group.clone());
            }
        }
        seen
    }

    pub fn invocations(&self) -> &[TestInvocation] {
        &self.invocations
    }

    pub fn len(&self) -> usize {
        self.invocations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invocations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_name_joins_executable_and_args() {
        let inv = TestInvocation::new("qjs", "tests/test_op.js");
        assert_eq!(inv.name(), "qjs tests/test_op.js");
        assert_eq!(TestInvocation::new("qjs", "").name(), "qjs");
        assert_eq!(TestInvocation::named("ops", "qjs", "x").name(), "ops");
    }

    #[test]
    fn test_quickjs_plan_shape() {
        let plan = TestPlan::quickjs();
        assert_eq!(plan.len(), 25);
        assert_eq!(plan.invocations()[0].name(), "qjsc -c -o repl.c -m repl.js");
        assert_eq!(
            plan.invocations().last().unwrap().name(),
            "qjs -d tests/bench-v8/combined.js"
        );
        assert_eq!(
            plan.groups(),
            vec![
                "js2c",
                "test",
                "stats",
                "microbench",
                "test262",
                "test262bn",
                "bench-v8"
            ]
        );
        assert_eq!(
            plan.executables(),
            vec!["qjsc", "qjsbnc", "qjs", "qjsbn", "run-test262", "run-test262-bn"]
        );
    }

    #[test]
    fn test_filter_groups_preserves_order() {
        let plan = TestPlan::quickjs().filter_groups(&["test262bn", "js2c"]);
        let names: Vec<String> = plan.invocations().iter().map(|i| i.name()).collect();
        assert_eq!(
            names,
            vec![
                "qjsc -c -o repl.c -m repl.js",
                "qjsbnc -c -o repl-bn.c -m repl.js",
                "qjsbnc -c -o qjscalc.c qjscalc.js",
                "run-test262-bn -m -c test262bn.conf",
                "run-test262-bn -m -c test262bn.conf -a",
            ]
        );
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let plan = TestPlan::quickjs();
        let empty: [&str; 0] = [];
        assert_eq!(plan.filter_groups(&empty), plan);
    }

    #[test]
    fn test_invocation_deserializes_without_name() {
        let inv: TestInvocation =
            serde_json::from_str(r#"{"executable": "qjs", "args": "-qd"}"#).unwrap();
        assert_eq!(inv.name(), "qjs -qd");
        assert_eq!(inv.group, None);
    }
}
