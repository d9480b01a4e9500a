//! Host Context: what the invoking host tells a stage about the call

#[derive(Debug, Clone)]
pub struct HostContext {
    pub program_id: String,
    pub trace_id: String,
    /// Identifier of the reporting node, when the host has one.
    pub node_id: Option<String>,
}

impl HostContext {
    pub fn new(program_id: impl Into<String>) -> Self {
        Self {
            program_id: program_id.into(),
            trace_id: uuid::Uuid::new_v4().to_string(),
            node_id: None,
        }
    }

    pub fn with_node(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}
