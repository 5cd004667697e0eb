use crate::{
    parse,
    CollectFuture,
    Collector,
    DataKind,
    Deadline,
    Transport,
};
use cluster_report_config::{
    CustomCollectorConfig,
    Node,
    ParserKind,
};
use std::sync::Arc;

/// Runs a user supplied command on every node and parses its output.
pub struct CustomCommand {
    name: String,
    command: String,
    parser: ParserKind,
    transport: Arc<dyn Transport>,
}

impl CustomCommand {
    pub fn new(config: &CustomCollectorConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            name: config.name.clone(),
            command: config.command.clone(),
            parser: config.parser,
            transport,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Collector for CustomCommand {
    fn name(&self) -> &str {
        &self.name
    }

    fn kinds(&self) -> &[DataKind] {
        &[DataKind::Custom]
    }

    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let output = deadline.run(self.transport.execute(node, &self.command)).await?;
            parse::command_output(self.parser, &output)
        })
    }
}
