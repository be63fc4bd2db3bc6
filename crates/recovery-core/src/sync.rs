//! Drives a channel manifest through classification, filtering, decoding and
//! merging for each entity kind.
//!
//! Items of one kind are decoded with bounded fan-out, but results are merged
//! one at a time from the single consuming loop, which is the only writer to
//! the store and the session during a call.
//!
//! A call may be dropped between items. Every merge that already happened
//! stays, and its count still reaches the session through [`MergeTally`].

use crate::channel::ChannelTransport;
use crate::cipher::PayloadCipher;
use crate::config::SyncConfig;
use crate::decoder::EntityDecoder;
use crate::error::{DecodeError, SyncError};
use crate::filter::{filter_candidates, select};
use crate::images::ImageStore;
use crate::session::RecoverySession;
use crate::store::RecoveryStore;
use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use recovery_api::data_id::{DataId, DataKind};
use recovery_api::types::RecoveryBootstrap;
use recovery_api::validation::ValidationError;
use std::collections::{BTreeSet, HashSet};
use std::future::Future;
use std::pin::pin;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedItem {
    pub data_id: String,
    pub reason: DecodeError,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub kind: DataKind,
    /// Ids left after filtering, before any download.
    pub candidates: usize,
    pub merged: usize,
    pub skipped: Vec<SkippedItem>,
}

impl SyncReport {
    fn new(kind: DataKind, candidates: usize) -> Self {
        Self {
            kind,
            candidates,
            merged: 0,
            skipped: Vec::new(),
        }
    }

    fn skip(&mut self, id: &DataId, reason: DecodeError) {
        warn!("skipping {}: {}", id, reason);
        self.skipped.push(SkippedItem {
            data_id: id.to_string(),
            reason,
        });
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollSummary {
    pub manifest_len: usize,
    pub profile: SyncReport,
    pub connections: SyncReport,
    pub groups: SyncReport,
    pub signatures: SyncReport,
}

impl PollSummary {
    /// Nothing on the channel is left to process.
    pub fn is_drained(&self) -> bool {
        self.reports().iter().all(|r| r.candidates == 0)
    }

    pub fn merged(&self) -> usize {
        self.reports().iter().map(|r| r.merged).sum()
    }

    fn reports(&self) -> [&SyncReport; 4] {
        [&self.profile, &self.connections, &self.groups, &self.signatures]
    }
}

#[derive(Clone, Copy)]
enum Counter {
    Connections,
    Groups,
    None,
}

/// Counts inserts that actually happened and hands the total to the session
/// once, when the tally goes out of scope. Dropping a sync future mid-batch
/// drops the tally too, so partial batches are still counted.
struct MergeTally<'a> {
    session: &'a RecoverySession,
    counter: Counter,
    merged: u64,
}

impl<'a> MergeTally<'a> {
    fn new(session: &'a RecoverySession, counter: Counter) -> Self {
        Self {
            session,
            counter,
            merged: 0,
        }
    }

    fn record(&mut self) {
        self.merged += 1;
    }
}

impl Drop for MergeTally<'_> {
    fn drop(&mut self) {
        if self.merged == 0 {
            return;
        }
        match self.counter {
            Counter::Connections => self.session.increase_recovered_connections(self.merged),
            Counter::Groups => self.session.increase_recovered_groups(self.merged),
            Counter::None => {}
        }
    }
}

#[derive(Clone)]
pub struct ChannelSync {
    channel: Arc<dyn ChannelTransport>,
    cipher: Arc<dyn PayloadCipher>,
    images: Arc<dyn ImageStore>,
    store: Arc<dyn RecoveryStore>,
    config: SyncConfig,
}

impl ChannelSync {
    pub fn new(
        channel: Arc<dyn ChannelTransport>,
        cipher: Arc<dyn PayloadCipher>,
        images: Arc<dyn ImageStore>,
        store: Arc<dyn RecoveryStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            channel,
            cipher,
            images,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn decoder<'a>(&'a self, session: &'a RecoverySession) -> EntityDecoder<'a> {
        EntityDecoder::new(
            self.channel.as_ref(),
            self.cipher.as_ref(),
            self.images.as_ref(),
            &self.config,
            session,
        )
    }

    /// Initial download of the uploader's signing key and timestamp. The only
    /// failure a user ever sees from this subsystem.
    pub async fn load_recovery_data(
        &self,
        session: &RecoverySession,
    ) -> Result<RecoveryBootstrap, SyncError> {
        self.decoder(session).bootstrap().await.map_err(|reason| {
            warn!("recovery bootstrap failed: {}", reason);
            SyncError::BadChannelData(reason)
        })
    }

    pub async fn poll_once(&self, session: &RecoverySession) -> Result<PollSummary, SyncError> {
        let manifest = self
            .channel
            .list(session.channel_id())
            .await
            .map_err(SyncError::Manifest)?;
        debug!("channel {} lists {} item(s)", session.channel_id(), manifest.len());
        let profile = self.sync_self_profile(session, &manifest).await?;
        let connections = self.sync_connections(session, &manifest).await?;
        let groups = self.sync_groups(session, &manifest).await?;
        let signatures = self.sync_signatures(session, &manifest).await?;
        Ok(PollSummary {
            manifest_len: manifest.len(),
            profile,
            connections,
            groups,
            signatures,
        })
    }

    async fn decode_each<T, F, Fut, M, MFut>(
        &self,
        candidates: BTreeSet<DataId>,
        report: &mut SyncReport,
        tally: &mut MergeTally<'_>,
        decode: F,
        mut merge: M,
    ) -> Result<(), SyncError>
    where
        F: Fn(DataId) -> Fut,
        Fut: Future<Output = (DataId, Result<T, DecodeError>)>,
        M: FnMut(T) -> MFut,
        MFut: Future<Output = Result<bool, SyncError>>,
    {
        let mut results = pin!(stream::iter(candidates.into_iter().map(decode))
            .buffer_unordered(self.config.fan_out()));
        while let Some((id, result)) = results.next().await {
            match result {
                Ok(record) => {
                    if merge(record).await? {
                        tally.record();
                        report.merged += 1;
                    } else {
                        debug!("{} already present, not merged", id);
                    }
                }
                Err(reason) => report.skip(&id, reason),
            }
        }
        Ok(())
    }

    pub async fn sync_connections<S: AsRef<str>>(
        &self,
        session: &RecoverySession,
        manifest: &[S],
    ) -> Result<SyncReport, SyncError> {
        let existing = self.store.connection_ids().await?;
        let excluded = HashSet::from([session.identity().to_string()]);
        let candidates =
            filter_candidates(select(manifest, DataKind::Connection), &existing, &excluded);
        let mut report = SyncReport::new(DataKind::Connection, candidates.len());
        let mut tally = MergeTally::new(session, Counter::Connections);
        let decoder = self.decoder(session);
        let store = self.store.as_ref();
        self.decode_each(
            candidates,
            &mut report,
            &mut tally,
            |id| {
                let decoder = &decoder;
                async move {
                    let result = decoder.connection(&id).await;
                    (id, result)
                }
            },
            |record| async move {
                if record.id == session.identity() {
                    return Ok(false);
                }
                store.add_connection(record).await.map_err(SyncError::from)
            },
        )
        .await?;
        drop(tally);
        info!(
            "connections: {} candidate(s), {} merged, {} skipped",
            report.candidates,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    pub async fn sync_groups<S: AsRef<str>>(
        &self,
        session: &RecoverySession,
        manifest: &[S],
    ) -> Result<SyncReport, SyncError> {
        let existing = self.store.group_ids().await?;
        let candidates =
            filter_candidates(select(manifest, DataKind::Group), &existing, &HashSet::new());
        let mut report = SyncReport::new(DataKind::Group, candidates.len());
        let mut tally = MergeTally::new(session, Counter::Groups);
        let decoder = self.decoder(session);
        let store = self.store.as_ref();
        self.decode_each(
            candidates,
            &mut report,
            &mut tally,
            |id| {
                let decoder = &decoder;
                async move {
                    let result = decoder.group(&id).await;
                    (id, result)
                }
            },
            |record| async move { store.add_group(record).await.map_err(SyncError::from) },
        )
        .await?;
        drop(tally);
        info!(
            "groups: {} candidate(s), {} merged, {} skipped",
            report.candidates,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    pub async fn sync_signatures<S: AsRef<str>>(
        &self,
        session: &RecoverySession,
        manifest: &[S],
    ) -> Result<SyncReport, SyncError> {
        let existing = session.signers().await;
        let candidates =
            filter_candidates(select(manifest, DataKind::Signature), &existing, &HashSet::new());
        let mut report = SyncReport::new(DataKind::Signature, candidates.len());
        let mut tally = MergeTally::new(session, Counter::None);
        let decoder = self.decoder(session);
        self.decode_each(
            candidates,
            &mut report,
            &mut tally,
            |id| {
                let decoder = &decoder;
                async move {
                    let result = decoder
                        .signature(&id)
                        .await
                        .map(|sig| (id.natural_key().to_string(), sig));
                    (id, result)
                }
            },
            |(signer, sig)| async move { Ok::<_, SyncError>(session.set_signature(signer, sig).await) },
        )
        .await?;
        info!(
            "signatures: {} candidate(s), {} recorded, {} skipped",
            report.candidates,
            report.merged,
            report.skipped.len()
        );
        Ok(report)
    }

    /// Resolves the recovering user's own name and photo, once. Sources are the
    /// `data` bundle and a `connection_<self>` card, in that order. A bundle
    /// that turned out to carry no name is not downloaded again.
    pub async fn sync_self_profile<S: AsRef<str>>(
        &self,
        session: &RecoverySession,
        manifest: &[S],
    ) -> Result<SyncReport, SyncError> {
        if session.name().await.is_some() {
            return Ok(SyncReport::new(DataKind::SelfProfile, 0));
        }
        let mut candidates = select(manifest, DataKind::SelfProfile);
        candidates.truncate(1);
        if session.has_nameless_bundle() {
            candidates.clear();
        }
        let own_card = DataId::connection(session.identity());
        let own_card_raw = own_card.to_string();
        if manifest.iter().any(|raw| raw.as_ref() == own_card_raw) {
            candidates.push(own_card);
        }
        let mut report = SyncReport::new(DataKind::SelfProfile, candidates.len());
        let decoder = self.decoder(session);
        for id in candidates {
            let candidate = match decoder.profile(&id).await {
                Ok(candidate) => candidate,
                Err(reason) => {
                    if id == DataId::SelfProfile && is_missing_name(&reason) {
                        session.mark_nameless_bundle();
                    }
                    report.skip(&id, reason);
                    continue;
                }
            };
            if candidate.owner != session.identity() {
                report.skip(
                    &id,
                    DecodeError::KeyMismatch {
                        expected: session.identity().to_string(),
                        found: candidate.owner,
                    },
                );
                continue;
            }
            if session.set_name_photo(candidate.profile).await {
                report.merged += 1;
                info!("profile: name and photo recovered from {}", id);
            }
            break;
        }
        Ok(report)
    }
}

fn is_missing_name(reason: &DecodeError) -> bool {
    matches!(
        reason,
        DecodeError::MissingData(ValidationError::Empty("name"))
            | DecodeError::MissingData(ValidationError::Missing("name"))
    )
}
