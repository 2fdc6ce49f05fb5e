use clap::Parser;

/// The command line args to pass to the ACI node provider
#[derive(Parser, Debug, Clone)]
#[clap(version, author)]
pub struct Args {
    /// The path to load the config file from
    #[clap(short, long, default_value = "provider.yml")]
    pub config: String,
    /// The name this node registers as with the orchestrator
    #[clap(long, default_value = "virtual-aci-node")]
    pub node_name: String,
}
