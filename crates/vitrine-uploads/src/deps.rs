use std::sync::Arc;
use vitrine_core::{EntityApi, UploadGateway, UploadTransport};

use crate::preview::PreviewFactory;

/// Collaborators injected into sessions and coordinators
#[derive(Clone)]
pub struct PipelineDeps {
    pub entities: Arc<dyn EntityApi>,
    pub gateway: Arc<dyn UploadGateway>,
    pub transport: Arc<dyn UploadTransport>,
    pub previews: Arc<dyn PreviewFactory>,
}

impl PipelineDeps {
    pub fn new(
        entities: Arc<dyn EntityApi>,
        gateway: Arc<dyn UploadGateway>,
        transport: Arc<dyn UploadTransport>,
        previews: Arc<dyn PreviewFactory>,
    ) -> Self {
        Self {
            entities,
            gateway,
            transport,
            previews,
        }
    }
}
