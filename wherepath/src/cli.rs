//! CLI argument parsing using clap

use clap::Parser;

/// Turn element predicates into XPath location paths
#[derive(Parser, Debug)]
#[command(name = "wherepath")]
#[command(author, version, about, long_about = None)]
#[command(after_help = r#"EXAMPLES:
    # Cell in the fifth row
    wherepath 'TargetElementName == "td" && Parent.Position == 5 && Parent.Name == "tr"'

    # Lambda form with a bound variable
    wherepath 'e => e.TargetElementName == "td" && e.Position == pos' --var pos=4

    # Predicate tree as JSON from stdin
    cat predicate.json | wherepath --json -

    # Show the query model instead of the XPath
    wherepath 'TargetElementName == "li" && Attribute("class").Contains("active")' --model
"#)]
pub struct Args {
    /// Predicate text (read from stdin when omitted)
    #[arg()]
    pub predicate: Option<String>,

    /// Read a JSON predicate tree from FILE ("-" for stdin)
    #[arg(short = 'j', long = "json", value_name = "FILE", conflicts_with = "predicate")]
    pub json: Option<String>,

    /// Bind a variable: NAME=VALUE (VALUE is JSON, or a plain string)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Fail on conditions that no rule recognises instead of skipping them
    #[arg(long = "strict")]
    pub strict: bool,

    /// Print the query model as JSON instead of the XPath
    #[arg(long = "model")]
    pub model: bool,

    /// Show verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}
