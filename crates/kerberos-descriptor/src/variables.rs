//! Expansion of `${type/property}` and `${property}` variables.
//!
//! Variables are looked up in a two level map of configuration type to property to value. The
//! empty type (`""`) holds global properties, which are referenced without a type: `${realm}`
//! is the same as looking up type `""`, property `realm`.
//!
//! - A variable is closed by the first `}` after its `${`. Variables do not nest.
//! - The type is everything before the first `/`, the property everything after it. Property
//!   names may contain further slashes.
//! - Variables that cannot be found are kept literally and are not an error.
//! - Values found for a variable are expanded themselves before they are inserted. A value that
//!   (directly or indirectly) references itself is an error, see [`Error::ResolutionCycle`].
//! - The output is not scanned again, so text that only looks like a variable after
//!   substitution is left alone.
//! - A `$` right before a variable is plain text: `$${host}` expands to `$` followed by the
//!   value of `host`.
use std::{collections::BTreeMap, sync::LazyLock};

use regex::Regex;
use snafu::Snafu;
use tracing::trace;

/// Configuration values by configuration type and property name.
pub type Configurations = BTreeMap<String, BTreeMap<String, String>>;

type Result<T, E = Error> = std::result::Result<T, E>;

// Lazily initialized regular expressions
static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([^}]*)\}").expect("failed to compile variable regex")
});

#[derive(Debug, PartialEq, Snafu)]
pub enum Error {
    /// A variable is part of its own expansion. `chain` lists every variable on the way, the
    /// first and last entry are the same.
    #[snafu(display("variable {variable:?} references itself: {}", chain.join(" -> ")))]
    ResolutionCycle { variable: String, chain: Vec<String> },
}

/// Replaces all variables in `text` with their values from `configurations`.
///
/// ```
/// # use kerberos_descriptor::variables::{Configurations, replace_variables};
/// let configurations = Configurations::from([
///     (String::new(), [("realm".to_owned(), "EXAMPLE.COM".to_owned())].into()),
///     ("cluster-env".to_owned(), [("user".to_owned(), "ambari-qa".to_owned())].into()),
/// ]);
///
/// assert_eq!(
///     replace_variables("${cluster-env/user}@${realm}", &configurations).unwrap(),
///     "ambari-qa@EXAMPLE.COM"
/// );
/// assert_eq!(
///     replace_variables("${unknown/user}", &configurations).unwrap(),
///     "${unknown/user}"
/// );
/// ```
pub fn replace_variables(text: &str, configurations: &Configurations) -> Result<String> {
    Resolver::new(configurations).expand(text)
}

/// Replaces all variables in every value of `configurations`, using `configurations` itself as
/// the source of values. Property names are left as they are.
pub fn replace_all_variables(configurations: &Configurations) -> Result<Configurations> {
    let resolver = Resolver::new(configurations);

    configurations
        .iter()
        .map(|(config_type, properties)| {
            let properties = properties
                .iter()
                .map(|(name, value)| Ok((name.clone(), resolver.expand(value)?)))
                .collect::<Result<BTreeMap<_, _>>>()?;
            Ok((config_type.clone(), properties))
        })
        .collect()
}

fn format_variable(config_type: &str, property: &str) -> String {
    if config_type.is_empty() {
        format!("${{{property}}}")
    } else {
        format!("${{{config_type}/{property}}}")
    }
}

/// One text being expanded: the caller's input at the bottom of the stack, the value of a
/// variable everywhere above it.
struct Frame<'a> {
    text: &'a str,
    position: usize,
    output: String,
    // `None` only for the caller's input
    variable: Option<(&'a str, &'a str)>,
}

impl<'a> Frame<'a> {
    fn new(text: &'a str, variable: Option<(&'a str, &'a str)>) -> Self {
        Self {
            text,
            position: 0,
            output: String::with_capacity(text.len()),
            variable,
        }
    }
}

struct Resolver<'c> {
    configurations: &'c Configurations,
}

impl<'c> Resolver<'c> {
    fn new(configurations: &'c Configurations) -> Self {
        Self { configurations }
    }

    /// Expands `text` depth first without recursing: the value of a variable is pushed as a new
    /// frame and spliced into its parent once it is fully expanded. The variables of all frames
    /// on the stack are exactly the ones currently being expanded.
    fn expand(&self, text: &str) -> Result<String> {
        let mut stack = vec![Frame::new(text, None)];
        let mut expanded = String::new();

        while let Some(frame) = stack.last_mut() {
            let Some(token) = VARIABLE_REGEX.find_at(frame.text, frame.position) else {
                frame.output.push_str(&frame.text[frame.position..]);
                let finished = std::mem::take(&mut frame.output);
                stack.pop();

                match stack.last_mut() {
                    Some(parent) => parent.output.push_str(&finished),
                    None => expanded = finished,
                }
                continue;
            };

            frame.output.push_str(&frame.text[frame.position..token.start()]);
            frame.position = token.end();

            // The token is `${name}`
            let token = token.as_str();
            let name = &token[2..token.len() - 1];
            let Some((config_type, property, value)) = self.lookup(name) else {
                trace!(variable = token, "variable not found, keeping it");
                frame.output.push_str(token);
                continue;
            };

            let variable = (config_type, property);
            if stack.iter().any(|open| open.variable == Some(variable)) {
                let chain = stack
                    .iter()
                    .filter_map(|open| open.variable)
                    .skip_while(|active| *active != variable)
                    .chain([variable])
                    .map(|(config_type, property)| format_variable(config_type, property))
                    .collect::<Vec<_>>();
                return ResolutionCycleSnafu {
                    variable: format_variable(config_type, property),
                    chain,
                }
                .fail();
            }

            stack.push(Frame::new(value, Some(variable)));
        }

        Ok(expanded)
    }

    /// Finds the value of the variable `name` (the text between `${` and `}`).
    fn lookup(&self, name: &str) -> Option<(&'c str, &'c str, &'c str)> {
        let configurations: &'c Configurations = self.configurations;
        let (config_type, property) = name.split_once('/').unwrap_or(("", name));

        let (config_type, properties) = configurations.get_key_value(config_type)?;
        let (property, value) = properties.get_key_value(property)?;
        Some((config_type, property, value))
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    fn properties(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[fixture]
    fn configurations() -> Configurations {
        Configurations::from([
            (
                String::new(),
                properties(&[
                    ("global_variable", "Hello World"),
                    ("variable-name", "dash"),
                    ("variable_name", "underscore"),
                    ("variable.name", "dot"),
                    ("host", "c6401.ambari.apache.org"),
                    ("realm", "EXAMPLE.COM"),
                ]),
            ),
            (
                "config_type".to_owned(),
                properties(&[
                    ("variable-name", "config_type_dash"),
                    ("variable_name", "config_type_underscore"),
                    ("variable.name", "config_type_dot"),
                ]),
            ),
            (
                "config.type".to_owned(),
                properties(&[
                    ("variable-name", "config.type_dash"),
                    ("variable_name", "config.type_underscore"),
                    ("variable.name", "config.type_dot"),
                ]),
            ),
            (
                "config-type".to_owned(),
                properties(&[
                    ("variable.name", "Replacement1"),
                    ("variable.name1", "${config-type2/variable.name}"),
                    ("variable.name2", ""),
                ]),
            ),
            (
                "config-type2".to_owned(),
                properties(&[
                    ("variable.name", "Replacement2"),
                    ("self_reference", "${config-type2/self_reference}"),
                    ("${config-type/variable.name}_reference", "Replacement in the key"),
                    ("indirect_a", "a(${config-type2/indirect_b})"),
                    ("indirect_b", "b(${config-type2/indirect_a})"),
                    ("looks_like_variable", "${"),
                ]),
            ),
        ])
    }

    #[rstest]
    #[case("concrete", "concrete")]
    #[case("", "")]
    #[case("${global_variable}", "Hello World")]
    #[case("${config-type/variable.name}", "Replacement1")]
    #[case(
        "${config-type/variable.name}|${config-type2/variable.name}",
        "Replacement1|Replacement2"
    )]
    #[case(
        "${config-type/variable.name}|${config-type2/variable.name}|${config-type3/variable.name}",
        "Replacement1|Replacement2|${config-type3/variable.name}"
    )]
    #[case(
        "${config-type/variable.name1}|${config-type2/variable.name}",
        "Replacement2|Replacement2"
    )]
    #[case("${config-type/variable.name}_reference", "Replacement1_reference")]
    #[case("${variable-name}", "dash")]
    #[case("${variable_name}", "underscore")]
    #[case("${variable.name}", "dot")]
    #[case("${config_type/variable.name}", "config_type_dot")]
    #[case("${config_type/variable-name}", "config_type_dash")]
    #[case("${config_type/variable_name}", "config_type_underscore")]
    #[case("${config.type/variable.name}", "config.type_dot")]
    #[case("${config.type/variable-name}", "config.type_dash")]
    #[case("${config.type/variable_name}", "config.type_underscore")]
    #[case::empty_value("${config-type/variable.name2}", "")]
    #[case::unknown_type("${unknown/p}", "${unknown/p}")]
    #[case::unknown_global("${nope}", "${nope}")]
    #[case::empty_name("${}", "${}")]
    #[case::unterminated("${realm", "${realm")]
    #[case::escaped_dollar("$${host}", "$c6401.ambari.apache.org")]
    #[case::braces_around("Hello my realm is {${realm}}", "Hello my realm is {EXAMPLE.COM}")]
    #[case::no_rescan("${config-type2/looks_like_variable}realm}", "${realm}")]
    #[case::same_variable_twice("${realm}/${realm}", "EXAMPLE.COM/EXAMPLE.COM")]
    fn replace(configurations: Configurations, #[case] input: &str, #[case] expected: &str) {
        assert_eq!(
            replace_variables(input, &configurations).expect("no resolution cycle"),
            expected
        );
    }

    #[rstest]
    fn replace_complicated(configurations: Configurations) {
        let input = "hive.metastore.local=false,\
            hive.metastore.uris=thrift://${host}:9083,\
            hive.metastore.sasl.enabled=true,\
            hive.metastore.kerberos.principal=hive/_HOST@${realm}";
        let expected = "hive.metastore.local=false,\
            hive.metastore.uris=thrift://c6401.ambari.apache.org:9083,\
            hive.metastore.sasl.enabled=true,\
            hive.metastore.kerberos.principal=hive/_HOST@EXAMPLE.COM";

        assert_eq!(
            replace_variables(input, &configurations).expect("no resolution cycle"),
            expected
        );
    }

    #[rstest]
    fn direct_self_reference_is_a_cycle(configurations: Configurations) {
        let error = replace_variables("${config-type2/self_reference}", &configurations)
            .expect_err("self reference must fail");

        assert_eq!(
            error,
            Error::ResolutionCycle {
                variable: "${config-type2/self_reference}".to_owned(),
                chain: vec![
                    "${config-type2/self_reference}".to_owned(),
                    "${config-type2/self_reference}".to_owned(),
                ],
            }
        );
    }

    #[rstest]
    fn indirect_self_reference_is_a_cycle(configurations: Configurations) {
        let error = replace_variables("prefix ${config-type2/indirect_a}", &configurations)
            .expect_err("indirect self reference must fail");

        let Error::ResolutionCycle { variable, chain } = error;
        assert_eq!(variable, "${config-type2/indirect_a}");
        assert_eq!(
            chain,
            [
                "${config-type2/indirect_a}",
                "${config-type2/indirect_b}",
                "${config-type2/indirect_a}"
            ]
        );
    }

    #[rstest]
    fn cycle_error_message(configurations: Configurations) {
        let error = replace_variables("${config-type2/self_reference}", &configurations)
            .expect_err("self reference must fail");

        assert_eq!(
            error.to_string(),
            "variable \"${config-type2/self_reference}\" references itself: \
            ${config-type2/self_reference} -> ${config-type2/self_reference}"
        );
    }

    #[test]
    fn long_reference_chains_do_not_exhaust_the_stack() {
        const DEPTH: usize = 5_000;

        let mut globals = (0..DEPTH)
            .map(|i| (format!("v{i}"), format!("${{v{}}}", i + 1)))
            .collect::<BTreeMap<_, _>>();
        globals.insert(format!("v{DEPTH}"), "end".to_owned());
        let configurations = Configurations::from([(String::new(), globals)]);

        assert_eq!(
            replace_variables("${v0}", &configurations).expect("no resolution cycle"),
            "end"
        );

        // A cycle closing at the far end of the chain is still detected
        let mut looping = configurations.clone();
        looping
            .entry(String::new())
            .or_default()
            .insert(format!("v{DEPTH}"), "${v0}".to_owned());
        let Error::ResolutionCycle { chain, .. } =
            replace_variables("${v0}", &looping).expect_err("chain loops back to v0");
        assert_eq!(chain.len(), DEPTH + 2);
    }

    #[rstest]
    fn resolution_is_idempotent(configurations: Configurations) {
        let once = replace_variables("${config-type/variable.name1}@${realm}", &configurations)
            .expect("no resolution cycle");
        let twice = replace_variables(&once, &configurations).expect("no resolution cycle");
        assert_eq!(once, twice);
    }

    #[test]
    fn replace_all() {
        let configurations = Configurations::from([
            (String::new(), properties(&[("realm", "EXAMPLE.COM")])),
            (
                "hdfs-site".to_owned(),
                properties(&[
                    ("dfs.principal", "nn/_HOST@${realm}"),
                    ("${realm}", "${hdfs-site/dfs.principal}"),
                ]),
            ),
        ]);

        let replaced = replace_all_variables(&configurations).expect("no resolution cycle");

        assert_eq!(
            replaced["hdfs-site"],
            properties(&[
                ("dfs.principal", "nn/_HOST@EXAMPLE.COM"),
                ("${realm}", "nn/_HOST@EXAMPLE.COM"),
            ])
        );
        assert_eq!(replaced[""], configurations[""]);
    }

    #[rstest]
    fn replace_all_reports_cycles(configurations: Configurations) {
        assert!(matches!(
            replace_all_variables(&configurations),
            Err(Error::ResolutionCycle { .. })
        ));
    }
}
