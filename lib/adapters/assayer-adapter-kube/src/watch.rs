//! Change feed over `Assessment` resources using the kube-rs watcher.

use std::pin::pin;

use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use kube::Client;
use kube::api::{Api, DynamicObject};
use kube::runtime::{WatchStreamExt, watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use assayer_ports::{AssessmentWatch, CancelToken};

use crate::store::assessment_api;

#[derive(Clone)]
pub struct KubeAssessmentWatch {
    api: Api<DynamicObject>,
}

impl KubeAssessmentWatch {
    pub fn new(client: Client) -> Self {
        Self {
            api: assessment_api(client),
        }
    }
}

#[async_trait]
impl AssessmentWatch for KubeAssessmentWatch {
    async fn watch(&self, cancel: &CancelToken, changes: UnboundedSender<String>) -> Result<()> {
        let mut objects = pin!(
            watcher(self.api.clone(), watcher::Config::default())
                .default_backoff()
                .touched_objects()
        );
        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                next = objects.next() => next,
            };
            match next {
                Some(Ok(object)) => {
                    let Some(name) = object.metadata.name else {
                        continue;
                    };
                    debug!(assessment = %name, "watch event");
                    if changes.send(name).is_err() {
                        return Ok(());
                    }
                }
                // The watcher backs off and re-lists on its own.
                Some(Err(err)) => warn!(error = %err, "assessment watch error"),
                None => return Ok(()),
            }
        }
    }
}
