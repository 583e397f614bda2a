//! Typed data-access operations over a [`Store`].
//!
//! Every operation returns a [`DataResult`]; failures are logged here and
//! handed back to the caller instead of being swallowed.

use std::{future::Future, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    appresult::{DataError, DataResult},
    db::{ContactList, Event, User},
    store::{Root, Store},
};

const USERNAME: &str = "username";
const EMAIL: &str = "email";
const PHONE: &str = "phone";
const OWNER: &str = "owner";
const AUTHOR: &str = "author";
const INVITED_USERS: &str = "invitedUsers";

/// Which of a prospective user's unique fields are already taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserExistence {
    pub username: bool,
    pub email: bool,
    pub phone: bool,
}

impl UserExistence {
    pub fn first_taken(&self) -> Option<&'static str> {
        if self.username {
            Some(USERNAME)
        } else if self.email {
            Some(EMAIL)
        } else if self.phone {
            Some(PHONE)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

#[derive(Clone)]
pub struct Database {
    store: Arc<dyn Store>,
    join_retries: u32,
}

fn decode<T: DeserializeOwned>(root: Root, key: &str, value: Value) -> DataResult<T> {
    serde_json::from_value(value)
        .map_err(|err| DataError::Invalid(format!("{root}/{key}: {err}")))
}

fn decode_all<T: DeserializeOwned>(root: Root, rows: Vec<(String, Value)>) -> DataResult<Vec<(String, T)>> {
    rows.into_iter()
        .map(|(key, value)| {
            let record = decode(root, &key, value)?;
            Ok((key, record))
        })
        .collect()
}

fn encode<T: Serialize>(record: &T) -> DataResult<Value> {
    Ok(serde_json::to_value(record)?)
}

fn non_empty<T>(rows: Vec<T>, what: impl FnOnce() -> String) -> DataResult<Vec<T>> {
    if rows.is_empty() {
        return Err(DataError::NotFound(what()));
    }
    Ok(rows)
}

async fn logged<T>(op: &'static str, operation: impl Future<Output = DataResult<T>>) -> DataResult<T> {
    let result = operation.await;
    if let Err(err) = &result {
        match err {
            DataError::NotFound(_) => tracing::debug!(op, error = %err),
            _ => tracing::warn!(op, error = %err),
        }
    }
    result
}

impl Database {
    pub fn new(store: Arc<dyn Store>, join_retries: u32) -> Database {
        Database { store, join_retries }
    }

    async fn exists(&self, child: &str, value: &str) -> DataResult<bool> {
        Ok(!self.store.query_eq(Root::Users, child, value).await?.is_empty())
    }

    /// Three independent lookups, one per unique user field.
    pub async fn check_if_user_exists(&self, username: &str, email: &str, phone: &str) -> DataResult<UserExistence> {
        logged("check_if_user_exists", async {
            Ok(UserExistence {
                username: self.exists(USERNAME, username).await?,
                email: self.exists(EMAIL, email).await?,
                phone: self.exists(PHONE, phone).await?,
            })
        })
        .await
    }

    /// Writes `users/<username>`, refusing to overwrite an existing user.
    pub async fn create_user(&self, user: &User) -> DataResult<()> {
        logged("create_user", async {
            if user.username.is_empty() {
                return Err(DataError::Invalid("username is required".to_owned()));
            }
            self.store.create(Root::Users, &user.username, encode(user)?).await
        })
        .await
    }

    /// Uniqueness check followed by [`Database::create_user`].
    ///
    /// Only the username is guarded atomically; two registrations racing on
    /// the same email or phone can both pass the check.
    pub async fn register_user(&self, user: &User) -> DataResult<()> {
        logged("register_user", async {
            let existence = self.check_if_user_exists(&user.username, &user.email, &user.phone).await?;
            if let Some(field) = existence.first_taken() {
                return Err(DataError::Conflict(format!("{field} already taken")));
            }
            self.create_user(user).await?;
            tracing::info!(username = %user.username, "registered user");
            Ok(())
        })
        .await
    }

    pub async fn get_users(&self) -> DataResult<Vec<User>> {
        logged("get_users", async {
            let rows = decode_all(Root::Users, self.store.list(Root::Users).await?)?;
            non_empty(rows.into_iter().map(|(_, user)| user).collect(), || "users".to_owned())
        })
        .await
    }

    pub async fn get_user_details(&self, email: &str) -> DataResult<Vec<User>> {
        logged("get_user_details", async {
            let rows = decode_all(Root::Users, self.store.query_eq(Root::Users, EMAIL, email).await?)?;
            non_empty(rows.into_iter().map(|(_, user)| user).collect(), || format!("user {email}"))
        })
        .await
    }

    pub async fn get_user_contact_lists(&self, owner: &str) -> DataResult<Vec<(String, ContactList)>> {
        logged("get_user_contact_lists", async {
            let rows = self.store.query_eq(Root::ContactLists, OWNER, owner).await?;
            non_empty(decode_all(Root::ContactLists, rows)?, || format!("contact lists of {owner}"))
        })
        .await
    }

    pub async fn add_event(&self, event: &Event) -> DataResult<String> {
        let id = logged("add_event", async { self.store.push(Root::Events, encode(event)?).await }).await?;
        tracing::info!(%id, title = %event.title, "added event");
        Ok(id)
    }

    /// Pushes every instance in order. A failure leaves the earlier
    /// instances in place.
    pub async fn add_event_series(&self, instances: &[Event]) -> DataResult<Vec<String>> {
        let mut ids = Vec::with_capacity(instances.len());
        for event in instances {
            ids.push(self.add_event(event).await?);
        }
        Ok(ids)
    }

    /// Every event with its store id, in creation order.
    pub async fn get_all_events(&self) -> DataResult<Vec<(String, Event)>> {
        logged("get_all_events", async { decode_all(Root::Events, self.store.list(Root::Events).await?) }).await
    }

    pub async fn get_event(&self, id: &str) -> DataResult<Event> {
        logged("get_event", async {
            let value = self
                .store
                .get(Root::Events, id)
                .await?
                .ok_or_else(|| DataError::NotFound(format!("event {id}")))?;
            decode(Root::Events, id, value)
        })
        .await
    }

    pub async fn get_event_by_email(&self, author: &str) -> DataResult<Vec<(String, Event)>> {
        logged("get_event_by_email", async {
            let rows = self.store.query_eq(Root::Events, AUTHOR, author).await?;
            non_empty(decode_all(Root::Events, rows)?, || format!("events by {author}"))
        })
        .await
    }

    /// Appends `email` to the event's invited users unless already present.
    ///
    /// The membership check and the append are applied with
    /// compare-and-set, so a concurrent join makes this attempt start over
    /// instead of clobbering the other write.
    pub async fn add_user_to_event(&self, event_id: &str, email: &str) -> DataResult<JoinOutcome> {
        let outcome = logged("add_user_to_event", async {
            for attempt in 0..=self.join_retries {
                let current = self
                    .store
                    .get(Root::Events, event_id)
                    .await?
                    .ok_or_else(|| DataError::NotFound(format!("event {event_id}")))?;

                let event: Event = decode(Root::Events, event_id, current.clone())?;
                if event.has_joined(email) {
                    return Ok(JoinOutcome::AlreadyJoined);
                }

                let mut invited = event.invited_users;
                invited.push(email.to_owned());
                let mut next = current.clone();
                let Some(fields) = next.as_object_mut() else {
                    return Err(DataError::Invalid(format!("events/{event_id} is not an object")));
                };
                fields.insert(INVITED_USERS.to_owned(), encode(&invited)?);

                if self.store.compare_and_set(Root::Events, event_id, &current, next).await? {
                    return Ok(JoinOutcome::Joined);
                }
                tracing::debug!(event_id, attempt, "invited users changed concurrently, retrying");
            }
            Err(DataError::Conflict(format!("event {event_id} kept changing while joining")))
        })
        .await?;
        tracing::info!(event_id, email, ?outcome, "join");
        Ok(outcome)
    }

    pub async fn get_lists(&self) -> DataResult<Vec<(String, ContactList)>> {
        logged("get_lists", async {
            let rows = self.store.list(Root::ContactLists).await?;
            non_empty(decode_all(Root::ContactLists, rows)?, || "contact lists".to_owned())
        })
        .await
    }

    pub async fn add_list(&self, list: &ContactList) -> DataResult<String> {
        logged("add_list", async { self.store.push(Root::ContactLists, encode(list)?).await }).await
    }

    pub async fn get_list_by_id(&self, id: &str) -> DataResult<ContactList> {
        logged("get_list_by_id", async {
            let value = self
                .store
                .get(Root::ContactLists, id)
                .await?
                .ok_or_else(|| DataError::NotFound(format!("contact list {id}")))?;
            decode(Root::ContactLists, id, value)
        })
        .await
    }

    /// Partial update: only the fields present in `fields` change.
    ///
    /// The merged document must still read as a [`ContactList`]; otherwise
    /// the update is refused and the stored list stays as it was.
    pub async fn update_list(&self, id: &str, fields: Map<String, Value>) -> DataResult<()> {
        logged("update_list", async {
            for attempt in 0..=self.join_retries {
                let current = self
                    .store
                    .get(Root::ContactLists, id)
                    .await?
                    .ok_or_else(|| DataError::NotFound(format!("contact list {id}")))?;

                let mut next = current.clone();
                let Some(object) = next.as_object_mut() else {
                    return Err(DataError::Invalid(format!("contactLists/{id} is not an object")));
                };
                object.extend(fields.clone());
                decode::<ContactList>(Root::ContactLists, id, next.clone())?;

                if self.store.compare_and_set(Root::ContactLists, id, &current, next).await? {
                    return Ok(());
                }
                tracing::debug!(id, attempt, "contact list changed concurrently, retrying");
            }
            Err(DataError::Conflict(format!("contact list {id} kept changing while updating")))
        })
        .await
    }

    pub async fn delete_list(&self, id: &str) -> DataResult<()> {
        logged("delete_list", self.store.remove(Root::ContactLists, id)).await
    }
}
