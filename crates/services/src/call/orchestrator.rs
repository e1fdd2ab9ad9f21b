use std::collections::HashMap;
use std::sync::Arc;

use bson::{DateTime, oid::ObjectId};
use dashmap::DashMap;
use fairline_captions::CaptionEngine;
use fairline_db::models::{Call, CallState, InterpreterStatus, QueueEntryStatus, UserRole};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, ChannelPublisher, call_room};
use crate::dao::base::DaoError;
use crate::dao::{BoothDao, CallDao, UserDao};
use crate::media::{MediaTransport, RoomCredential, TransportError};
use crate::queue::{KeyedSerializer, QueueError, QueueManager};

use super::cleanup::{CleanupStep, run_cleanup};
use super::roster::Roster;

#[derive(Debug, Error)]
pub enum CallError {
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    #[error("not found")]
    NotFound,
    #[error("recruiter already has a live call")]
    RecruiterBusy,
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Queue(QueueError),
    #[error(transparent)]
    Dao(DaoError),
}

impl From<DaoError> for CallError {
    fn from(err: DaoError) -> Self {
        match err {
            DaoError::NotFound => CallError::NotFound,
            other => CallError::Dao(other),
        }
    }
}

impl From<QueueError> for CallError {
    fn from(err: QueueError) -> Self {
        match err {
            QueueError::NotFound => CallError::NotFound,
            other => CallError::Queue(other),
        }
    }
}

pub type CallResult<T> = Result<T, CallError>;

/// Owns the call lifecycle: room provisioning, invitations, interpreter
/// slots, presence reconciliation, and the end-of-call teardown. Media rooms
/// exist only between `create_call` and the end saga; nothing else touches
/// the provider.
pub struct CallOrchestrator {
    calls: Arc<CallDao>,
    users: Arc<UserDao>,
    booths: Arc<BoothDao>,
    queue: Arc<QueueManager>,
    transport: Arc<dyn MediaTransport>,
    channel: Arc<dyn ChannelPublisher>,
    captions: Arc<CaptionEngine>,
    rosters: DashMap<ObjectId, Roster>,
    serializer: KeyedSerializer,
    recruiter_serializer: KeyedSerializer,
}

impl CallOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        calls: Arc<CallDao>,
        users: Arc<UserDao>,
        booths: Arc<BoothDao>,
        queue: Arc<QueueManager>,
        transport: Arc<dyn MediaTransport>,
        channel: Arc<dyn ChannelPublisher>,
        captions: Arc<CaptionEngine>,
    ) -> Self {
        Self {
            calls,
            users,
            booths,
            queue,
            transport,
            channel,
            captions,
            rosters: DashMap::new(),
            serializer: KeyedSerializer::new(),
            recruiter_serializer: KeyedSerializer::new(),
        }
    }

    pub fn calls(&self) -> &CallDao {
        &self.calls
    }

    /// Recruiter picks a waiting attendee: provisions a media room, flips
    /// the queue entry to `in_meeting`, records the call, and delivers the
    /// invitation with the attendee's own room credential.
    ///
    /// Returns the call and the recruiter's credential.
    pub async fn create_call(
        &self,
        queue_entry_id: ObjectId,
        recruiter_id: ObjectId,
    ) -> CallResult<(Call, RoomCredential)> {
        let entry = self.queue.dao().find_entry(queue_entry_id).await?;
        if !self.booths.is_recruiter(entry.booth_id, recruiter_id).await? {
            return Err(CallError::PermissionDenied(
                "not a recruiter of this booth",
            ));
        }
        if entry.status != QueueEntryStatus::Waiting {
            return Err(CallError::InvalidState("queue entry is not waiting"));
        }

        // One creation at a time per recruiter: the busy check and the call
        // insert below must not interleave with another create_call.
        let recruiter_guard = self.recruiter_serializer.acquire(recruiter_id).await;
        if self.calls.live_for_recruiter(recruiter_id).await?.is_some() {
            return Err(CallError::RecruiterBusy);
        }
        let booth = self.booths.find(entry.booth_id).await?;

        let room = self.transport.create_room().await?;
        let recruiter_name = self.users.display_name(recruiter_id).await;
        let seeker_name = self.users.display_name(entry.job_seeker_id).await;

        let recruiter_cred = self
            .transport
            .mint_credential(&room.room_name, &recruiter_id.to_hex(), &recruiter_name)
            .await?;
        let seeker_cred = self
            .transport
            .mint_credential(
                &room.room_name,
                &entry.job_seeker_id.to_hex(),
                &seeker_name,
            )
            .await?;

        // Consume the queue slot before the call record exists; if this
        // loses a race the room is returned to the provider.
        if let Err(e) = self.queue.invite(queue_entry_id).await {
            if let Err(te) = self.transport.remove_room(&room.room_name).await {
                warn!(room = %room.room_name, %te, "Failed to release room after invite race");
            }
            return Err(e.into());
        }

        let call = self
            .calls
            .create(&Call {
                id: None,
                room_name: room.room_name.clone(),
                booth_id: entry.booth_id,
                event_id: booth.event_id,
                queue_entry_id,
                recruiter_id,
                job_seeker_id: entry.job_seeker_id,
                interpreters: Vec::new(),
                state: CallState::Created,
                created_at: DateTime::now(),
                ended_at: None,
            })
            .await?;
        let call_id = call.id.ok_or(CallError::NotFound)?;
        drop(recruiter_guard);

        let mut names = HashMap::new();
        names.insert(recruiter_id, recruiter_name);
        names.insert(entry.job_seeker_id, seeker_name);
        self.rosters.insert(call_id, Roster::from_call(&call, &names));

        self.channel
            .publish_to_user(
                entry.job_seeker_id,
                &ChannelEvent::CallInvitation {
                    call_id: call_id.to_hex(),
                    booth_id: entry.booth_id.to_hex(),
                    room_name: room.room_name.clone(),
                    recruiter_id: recruiter_id.to_hex(),
                    credential: seeker_cred.token,
                },
            )
            .await;

        self.calls.activate(call_id).await?;
        info!(%call_id, %recruiter_id, job_seeker_id = %entry.job_seeker_id, "Call created");

        Ok((self.calls.find(call_id).await?, recruiter_cred))
    }

    /// The attendee answers the invitation. Accept returns a fresh credential
    /// for their client; decline tears the call down (the recruiter is freed
    /// for the next attendee, and the queue slot stays consumed).
    pub async fn respond_to_invitation(
        &self,
        call_id: ObjectId,
        job_seeker_id: ObjectId,
        accept: bool,
    ) -> CallResult<Option<RoomCredential>> {
        let call = self.calls.find(call_id).await?;
        if call.job_seeker_id != job_seeker_id {
            return Err(CallError::PermissionDenied("not this call's attendee"));
        }
        if call.state == CallState::Ended {
            return Err(CallError::InvalidState("call already ended"));
        }

        if !accept {
            info!(%call_id, "Invitation declined");
            if self.calls.end(call_id).await? {
                self.teardown(&call).await;
            }
            return Ok(None);
        }

        let name = self.users.display_name(job_seeker_id).await;
        let cred = self
            .transport
            .mint_credential(&call.room_name, &job_seeker_id.to_hex(), &name)
            .await?;
        Ok(Some(cred))
    }

    /// Recruiter requests an interpreter for the live call. The invitation
    /// lands on the interpreter's own channel; the slot stays `invited` until
    /// they respond.
    pub async fn invite_interpreter(
        &self,
        call_id: ObjectId,
        recruiter_id: ObjectId,
        interpreter_id: ObjectId,
        category: &str,
    ) -> CallResult<()> {
        let _guard = self.serializer.acquire(call_id).await;

        let call = self.calls.find(call_id).await?;
        if call.recruiter_id != recruiter_id {
            return Err(CallError::PermissionDenied("not this call's recruiter"));
        }
        if call.state == CallState::Ended {
            return Err(CallError::InvalidState("call already ended"));
        }

        let interpreter = self.users.find(interpreter_id).await?;
        if interpreter.role != UserRole::Interpreter {
            return Err(CallError::Conflict("user is not an interpreter"));
        }
        if self.calls.interpreter_engaged(interpreter_id).await? {
            return Err(CallError::Conflict("interpreter is engaged elsewhere"));
        }
        if !self
            .calls
            .push_interpreter(call_id, interpreter_id, category)
            .await?
        {
            return Err(CallError::Conflict("interpreter already invited"));
        }
        drop(_guard);
        debug!(%call_id, %interpreter_id, category, "Interpreter invited");

        self.channel
            .publish_to_user(
                interpreter_id,
                &ChannelEvent::InterpreterInvitation {
                    call_id: call_id.to_hex(),
                    category: category.to_string(),
                    recruiter_id: recruiter_id.to_hex(),
                },
            )
            .await;
        Ok(())
    }

    /// Interpreter answers their invitation. Either way the call room gets a
    /// system message; an accept also updates the roster and returns the
    /// interpreter's room credential. A declined slot does not block a later
    /// re-invitation of the same interpreter.
    pub async fn interpreter_respond(
        &self,
        call_id: ObjectId,
        interpreter_id: ObjectId,
        accept: bool,
    ) -> CallResult<Option<RoomCredential>> {
        let call = self.calls.find(call_id).await?;
        if call.state == CallState::Ended {
            return Err(CallError::InvalidState("call already ended"));
        }
        let category = call
            .interpreters
            .iter()
            .find(|s| {
                s.interpreter_id == interpreter_id && s.status == InterpreterStatus::Invited
            })
            .map(|s| s.category.clone())
            .ok_or(CallError::InvalidState("no pending invitation"))?;

        let status = if accept {
            InterpreterStatus::Joined
        } else {
            InterpreterStatus::Declined
        };
        if !self
            .calls
            .resolve_interpreter(call_id, interpreter_id, status)
            .await?
        {
            return Err(CallError::InvalidState("no pending invitation"));
        }

        let name = self.users.display_name(interpreter_id).await;
        let message = if accept {
            format!("{name} joined as {category} interpreter")
        } else {
            format!("{name} declined the {category} interpreter request")
        };
        self.channel
            .publish(
                &call_room(call_id),
                &ChannelEvent::InterpreterResponse {
                    call_id: call_id.to_hex(),
                    interpreter_id: interpreter_id.to_hex(),
                    category: category.clone(),
                    accepted: accept,
                    message,
                },
            )
            .await;

        if !accept {
            return Ok(None);
        }

        self.ensure_roster(call_id, &call).await;
        let participants = {
            let mut roster = self
                .rosters
                .get_mut(&call_id)
                .ok_or(CallError::NotFound)?;
            roster.add_interpreter(interpreter_id, name.clone());
            roster.to_json()
        };
        self.channel
            .publish(
                &call_room(call_id),
                &ChannelEvent::RosterUpdated {
                    call_id: call_id.to_hex(),
                    participants,
                },
            )
            .await;

        let cred = self
            .transport
            .mint_credential(&call.room_name, &interpreter_id.to_hex(), &name)
            .await?;
        Ok(Some(cred))
    }

    /// One participant hangs up without ending the call. Their transport
    /// publications are dropped best-effort; the call keeps going for
    /// everyone else.
    pub async fn leave(&self, call_id: ObjectId, user_id: ObjectId) -> CallResult<()> {
        let call = self.calls.find(call_id).await?;
        if call.state == CallState::Ended {
            // Already torn down; nothing left to leave.
            return Ok(());
        }

        let identity = user_id.to_hex();
        self.ensure_roster(call_id, &call).await;
        let is_participant = self
            .rosters
            .get(&call_id)
            .map(|r| r.contains_user(user_id))
            .unwrap_or(false);
        if !is_participant {
            return Err(CallError::PermissionDenied("not a call participant"));
        }

        if let Err(e) = self
            .transport
            .remove_participant(&call.room_name, &identity)
            .await
        {
            warn!(%call_id, %identity, %e, "Failed to remove participant from room");
        }

        let participants = {
            let mut roster = self
                .rosters
                .get_mut(&call_id)
                .ok_or(CallError::NotFound)?;
            roster.mark_absent(&identity);
            roster.to_json()
        };

        self.channel
            .publish(
                &call_room(call_id),
                &ChannelEvent::ParticipantLeft {
                    call_id: call_id.to_hex(),
                    participant_id: identity,
                },
            )
            .await;
        self.channel
            .publish(
                &call_room(call_id),
                &ChannelEvent::RosterUpdated {
                    call_id: call_id.to_hex(),
                    participants,
                },
            )
            .await;
        Ok(())
    }

    /// Ends the call for everyone. Only the recruiter may do this; a second
    /// end is `InvalidState`. The queue entry stays `in_meeting`, so the
    /// attendee does not reappear in the booth's waiting list.
    pub async fn end(&self, call_id: ObjectId, initiator_id: ObjectId) -> CallResult<()> {
        let call = self.calls.find(call_id).await?;
        if call.recruiter_id != initiator_id {
            return Err(CallError::PermissionDenied("only the recruiter can end a call"));
        }
        if !self.calls.end(call_id).await? {
            return Err(CallError::InvalidState("call already ended"));
        }

        self.teardown(&call).await;
        Ok(())
    }

    /// The post-`ended` teardown. Steps run in a fixed order and a failure
    /// never blocks the remaining steps.
    async fn teardown(&self, call: &Call) {
        let Some(call_id) = call.id else { return };
        let room_name = call.room_name.clone();
        let call_hex = call_id.to_hex();

        run_cleanup(
            &call_hex,
            vec![
                CleanupStep::new("remove_room", {
                    let transport = self.transport.clone();
                    let room_name = room_name.clone();
                    async move { Ok(transport.remove_room(&room_name).await?) }
                }),
                CleanupStep::new("notify_participants", {
                    let channel = self.channel.clone();
                    let call_hex = call_hex.clone();
                    let room_name = room_name.clone();
                    async move {
                        channel
                            .publish(
                                &call_room(call_id),
                                &ChannelEvent::CallEnded {
                                    call_id: call_hex,
                                    room_name,
                                },
                            )
                            .await;
                        Ok(())
                    }
                }),
                CleanupStep::new("caption_sessions", {
                    let captions = self.captions.clone();
                    let call_hex = call_hex.clone();
                    async move {
                        captions.end_call(&call_hex);
                        Ok(())
                    }
                }),
            ],
        )
        .await;

        self.rosters.remove(&call_id);
    }

    /// Presence webhook from the media provider. Identities this call minted
    /// match a roster entry exactly; anything else is resolved by email or
    /// kept as a generic participant, never dropped.
    pub async fn handle_presence(
        &self,
        room_name: &str,
        identity: &str,
        joined: bool,
    ) -> CallResult<()> {
        let Some(call) = self.calls.find_by_room(room_name).await? else {
            debug!(%room_name, "Presence for unknown room ignored");
            return Ok(());
        };
        if call.state == CallState::Ended {
            return Ok(());
        }
        let call_id = call.id.ok_or(CallError::NotFound)?;

        self.ensure_roster(call_id, &call).await;

        // Resolve before mutating so no await happens under the map guard.
        let known = self
            .rosters
            .get(&call_id)
            .map(|r| r.entries().iter().any(|e| e.identity == identity))
            .unwrap_or(false);
        let mut resolved: Option<(ObjectId, String)> = None;
        if joined && !known && identity.contains('@') {
            if let Ok(Some(user)) = self.users.find_by_email(identity).await {
                if let Some(user_id) = user.id {
                    resolved = Some((user_id, user.display_name));
                }
            }
        }

        let participants = {
            let mut roster = self
                .rosters
                .get_mut(&call_id)
                .ok_or(CallError::NotFound)?;
            if joined {
                if !roster.mark_present(identity) {
                    match resolved {
                        Some((user_id, name)) => {
                            if !roster.mark_present_by_user(user_id) {
                                roster.add_guest(identity, &name);
                            }
                        }
                        None => roster.add_guest(identity, identity),
                    }
                }
            } else {
                roster.mark_absent(identity);
            }
            roster.to_json()
        };

        self.channel
            .publish(
                &call_room(call_id),
                &ChannelEvent::RosterUpdated {
                    call_id: call_id.to_hex(),
                    participants,
                },
            )
            .await;
        Ok(())
    }

    pub async fn roster(&self, call_id: ObjectId) -> CallResult<Vec<serde_json::Value>> {
        if let Some(roster) = self.rosters.get(&call_id) {
            return Ok(roster.to_json());
        }
        let call = self.calls.find(call_id).await?;
        let names = self.collect_names(&call).await;
        Ok(Roster::from_call(&call, &names).to_json())
    }

    /// Rebuilds the in-memory roster from the call record when it is
    /// missing, as after a process restart while the call is still live.
    async fn ensure_roster(&self, call_id: ObjectId, call: &Call) {
        if !self.rosters.contains_key(&call_id) {
            let names = self.collect_names(call).await;
            self.rosters
                .entry(call_id)
                .or_insert_with(|| Roster::from_call(call, &names));
        }
    }

    async fn collect_names(&self, call: &Call) -> HashMap<ObjectId, String> {
        let mut ids = vec![call.recruiter_id, call.job_seeker_id];
        for slot in &call.interpreters {
            if slot.status == InterpreterStatus::Joined {
                ids.push(slot.interpreter_id);
            }
        }
        let mut names = HashMap::new();
        for id in ids {
            names.insert(id, self.users.display_name(id).await);
        }
        names
    }
}
