//! End-to-end lifecycle scenarios against an in-memory cache

mod common;

use common::*;
use optimistic_sync::models::{CommentRecord, NotificationRecord, PostRecord};
use optimistic_sync::{
    CollectingToasts, CommentInput, LifecycleState, MutationOrchestrator, MutationRequest,
    MutationResponse, MutationStatus, ProfileInput, SyncAction, SyncError, ToastVariant,
    TransportError,
};
use parking_lot::Mutex;
use query_cache::{CacheKey, FetchOutcome, QueryCache};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Semaphore;

fn like(currently_liked: bool) -> SyncAction {
    SyncAction::LikeToggle {
        post_id: "p1".into(),
        currently_liked,
    }
}

/// Transport that records the value of `key` at the moment each request leaves
fn recording(
    cache: &Arc<QueryCache>,
    key: CacheKey,
) -> (ScriptedTransport, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = {
        let cache = cache.clone();
        let seen = seen.clone();
        ScriptedTransport::new().observe(move |_| {
            if let Some(value) = cache.get(&key) {
                seen.lock().push(value.data);
            }
        })
    };
    (transport, seen)
}

#[tokio::test]
async fn like_toggle_success() {
    let cache = Arc::new(QueryCache::new());
    let key = CacheKey::like_data("p1");
    cache.set(key.clone(), json!({"likesCount": 4, "isLikedByUser": false}));

    let (transport, seen) = recording(&cache, key.clone());
    let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
    let outcome = orchestrator.execute(like(false)).await;

    assert_eq!(outcome.status, MutationStatus::Succeeded);
    assert_eq!(
        seen.lock().clone(),
        vec![json!({"likesCount": 5, "isLikedByUser": true})]
    );
    assert_eq!(cache.is_stale(&key), Some(true));

    let server = FakeServer::new();
    server.put(key.clone(), json!({"likesCount": 5, "isLikedByUser": true}));
    let fresh = cache.ensure_fresh(&key, &server).await.unwrap();
    assert_eq!(fresh, json!({"likesCount": 5, "isLikedByUser": true}));
    assert_eq!(cache.is_stale(&key), Some(false));
}

#[tokio::test]
async fn follow_toggle_failure_rolls_back() {
    let cache = Arc::new(QueryCache::new());
    let key = CacheKey::follower_data("u1");
    cache.set(key.clone(), json!({"followerCount": 10, "isFollowedByUser": false}));

    let (transport, seen) = recording(&cache, key.clone());
    let transport = transport.respond(Err(TransportError::Server {
        status: 500,
        message: "Internal server error".into(),
    }));
    let toasts = Arc::new(CollectingToasts::new());
    let orchestrator =
        MutationOrchestrator::new(cache.clone(), transport).with_toasts(toasts.clone());

    let outcome = orchestrator
        .execute(SyncAction::FollowToggle {
            user_id: "u1".into(),
            currently_following: false,
        })
        .await;

    assert_eq!(
        seen.lock().clone(),
        vec![json!({"followerCount": 11, "isFollowedByUser": true})]
    );
    assert_eq!(outcome.status, MutationStatus::Failed);
    assert!(outcome.rolled_back);
    assert!(outcome.history.contains(&LifecycleState::Failed));
    assert_eq!(outcome.history.last(), Some(&LifecycleState::Settled));
    assert_eq!(
        cache.get(&key).unwrap().data,
        json!({"followerCount": 10, "isFollowedByUser": false})
    );

    let shown = toasts.toasts();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].variant, ToastVariant::Destructive);
}

#[tokio::test]
async fn mark_all_notifications_read() {
    for fail in [false, true] {
        let cache = Arc::new(QueryCache::new());
        let feed_key = CacheKey::notifications_feed();
        let count_key = CacheKey::unread_notifications_count();
        let unread = feed(vec![notification("n1"), notification("n2"), notification("n3")]);
        cache.set(feed_key.clone(), unread.clone());
        cache.set(count_key.clone(), json!({"unreadCount": 3}));

        let seen = Arc::new(Mutex::new(None));
        let transport = {
            let cache = cache.clone();
            let seen = seen.clone();
            let (feed_key, count_key) = (feed_key.clone(), count_key.clone());
            ScriptedTransport::new().observe(move |_| {
                let feed = cache.get(&feed_key).unwrap().data;
                let count = cache.get(&count_key).unwrap().data;
                *seen.lock() = Some((records::<NotificationRecord>(&feed).len(), count));
            })
        };
        let transport = if fail {
            transport.respond(Err(TransportError::Network("connection reset".into())))
        } else {
            transport
        };

        let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
        let outcome = orchestrator.execute(SyncAction::NotificationMarkAll).await;

        assert_eq!(seen.lock().clone(), Some((0, json!({"unreadCount": 0}))));
        assert_eq!(outcome.invalidated, 2);
        assert_eq!(cache.is_stale(&feed_key), Some(true));
        assert_eq!(cache.is_stale(&count_key), Some(true));

        if fail {
            assert_eq!(cache.get(&feed_key).unwrap().data, unread);
            assert_eq!(cache.get(&count_key).unwrap().data, json!({"unreadCount": 3}));
        }

        // The refetch is the source of truth either way
        let server = FakeServer::new();
        server.put(feed_key.clone(), page::<NotificationRecord>(vec![]));
        server.put(count_key.clone(), json!({"unreadCount": 0}));
        let fresh = cache.ensure_fresh(&count_key, &server).await.unwrap();
        assert_eq!(fresh, json!({"unreadCount": 0}));
        let fresh = cache.ensure_fresh(&feed_key, &server).await.unwrap();
        assert!(records::<NotificationRecord>(&fresh).is_empty());
    }
}

#[tokio::test]
async fn concurrent_double_like() {
    let cache = Arc::new(QueryCache::new());
    let key = CacheKey::like_data("p1");
    cache.set(key.clone(), json!({"likesCount": 4, "isLikedByUser": false}));

    let gate = Arc::new(Semaphore::new(0));
    let (transport, seen) = recording(&cache, key.clone());
    let orchestrator = MutationOrchestrator::new(cache.clone(), transport.gated(gate.clone()));

    let release = async {
        tokio::task::yield_now().await;
        gate.add_permits(2);
    };
    let (first, second, _) = tokio::join!(
        orchestrator.execute(like(false)),
        orchestrator.execute(like(false)),
        release
    );

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(orchestrator.transport().sent().len(), 2);
    assert_eq!(
        seen.lock().clone(),
        vec![
            json!({"likesCount": 5, "isLikedByUser": true}),
            json!({"likesCount": 6, "isLikedByUser": true}),
        ]
    );
    assert_eq!(cache.is_stale(&key), Some(true));

    // The displayed value comes from one authoritative read
    let server = FakeServer::new();
    server.put(key.clone(), json!({"likesCount": 5, "isLikedByUser": true}));
    let fresh = cache.ensure_fresh(&key, &server).await.unwrap();
    assert_eq!(fresh, json!({"likesCount": 5, "isLikedByUser": true}));
}

#[tokio::test]
async fn counter_never_goes_below_zero() {
    let cache = Arc::new(QueryCache::new());
    let key = CacheKey::like_data("p1");
    cache.set(key.clone(), json!({"likesCount": 0, "isLikedByUser": true}));

    let transport = ScriptedTransport::new()
        .respond(Ok(MutationResponse::Ack))
        .respond(Err(TransportError::Timeout))
        .respond(Ok(MutationResponse::Ack))
        .respond(Err(TransportError::Unauthorized));
    let orchestrator = MutationOrchestrator::new(cache.clone(), transport);

    for currently_liked in [true, true, true, false, true, true] {
        orchestrator.execute(like(currently_liked)).await;
        let count = cache.get(&key).unwrap().data["likesCount"].as_i64().unwrap();
        assert!(count >= 0);
        assert!(count <= 1);
    }
}

#[tokio::test]
async fn dependents_move_by_identical_delta() {
    let cache = Arc::new(QueryCache::new());
    cache.set(CacheKey::like_data("p1"), json!({"likesCount": 4, "isLikedByUser": false}));
    cache.set(CacheKey::for_you_feed(), feed(vec![post("p1", "u1"), post("p2", "u1")]));
    cache.set(CacheKey::user_posts_feed("u1"), feed(vec![post("p1", "u1")]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = {
        let cache = cache.clone();
        let seen = seen.clone();
        ScriptedTransport::new().observe(move |_| {
            let mut counts = seen.lock();
            let like = cache.get(&CacheKey::like_data("p1")).unwrap().data;
            counts.push(like["likesCount"].clone());
            for key in [CacheKey::for_you_feed(), CacheKey::user_posts_feed("u1")] {
                let posts = records::<PostRecord>(&cache.get(&key).unwrap().data);
                let copy = posts.iter().find(|p| p.id == "p1").unwrap();
                counts.push(json!(copy.like_count));
            }
        })
    };

    let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
    let outcome = orchestrator.execute(like(false)).await;

    assert_eq!(outcome.affected_keys.len(), 3);
    assert_eq!(seen.lock().clone(), vec![json!(5), json!(5), json!(5)]);

    let untouched = records::<PostRecord>(&cache.get(&CacheKey::for_you_feed()).unwrap().data);
    assert_eq!(untouched[1].like_count, 4);
}

#[tokio::test]
async fn no_orphaned_optimistic_state() {
    let cache = Arc::new(QueryCache::new());
    let keys = [
        CacheKey::bookmark_data("p1"),
        CacheKey::bookmarks_feed(),
        CacheKey::for_you_feed(),
    ];
    let mut bookmarked = post("p1", "u1");
    bookmarked.is_bookmarked_by_user = true;
    cache.set(keys[0].clone(), json!({"isBookmarkedByUser": true}));
    cache.set(keys[1].clone(), feed(vec![bookmarked.clone()]));
    cache.set(keys[2].clone(), feed(vec![bookmarked]));
    let before: Vec<Value> = keys.iter().map(|k| cache.get(k).unwrap().data).collect();

    let unbookmark = SyncAction::BookmarkToggle {
        post_id: "p1".into(),
        currently_bookmarked: true,
    };

    // Failure: every key holds its snapshot value
    let orchestrator = MutationOrchestrator::new(
        cache.clone(),
        ScriptedTransport::new().respond(Err(TransportError::NotFound("post".into()))),
    );
    let outcome = orchestrator.execute(unbookmark.clone()).await;
    assert!(matches!(outcome.error, Some(SyncError::NotFound(_))));
    let after: Vec<Value> = keys.iter().map(|k| cache.get(k).unwrap().data).collect();
    assert_eq!(after, before);

    // Success: every key is stale, so the next read goes to the server
    let orchestrator = MutationOrchestrator::new(cache.clone(), ScriptedTransport::new());
    let outcome = orchestrator.execute(unbookmark).await;
    assert!(outcome.is_success());
    assert!(records::<PostRecord>(&cache.get(&keys[1]).unwrap().data).is_empty());
    for key in &keys {
        assert_eq!(cache.is_stale(key), Some(true), "{} not invalidated", key);
    }
}

#[tokio::test]
async fn superseded_read_is_discarded() {
    let cache = Arc::new(QueryCache::new());
    let key = CacheKey::like_data("p1");
    cache.set(key.clone(), json!({"likesCount": 4, "isLikedByUser": false}));

    let read_gate = Arc::new(Semaphore::new(0));
    let server = FakeServer::gated(read_gate.clone());
    server.put(key.clone(), json!({"likesCount": 4, "isLikedByUser": false}));

    let orchestrator = MutationOrchestrator::new(cache.clone(), ScriptedTransport::new());

    let read = cache.fetch(&key, &server);
    let mutate = async {
        let outcome = orchestrator.execute(like(false)).await;
        read_gate.add_permits(1);
        outcome
    };
    let (read, outcome) = tokio::join!(read, mutate);

    assert_eq!(read.unwrap(), FetchOutcome::Discarded);
    assert!(outcome.is_success());
    assert_eq!(
        cache.get(&key).unwrap().data,
        json!({"likesCount": 5, "isLikedByUser": true})
    );
}

#[tokio::test]
async fn comment_placeholder_replaced_on_success() {
    let cache = Arc::new(QueryCache::new());
    let comments_key = CacheKey::comment_feed("p1");
    cache.set(comments_key.clone(), feed(vec![comment("c1", "p1", "u2")]));
    cache.set(CacheKey::for_you_feed(), feed(vec![post("p1", "u1")]));

    let created = comment("c2", "p1", "me");
    let transport =
        ScriptedTransport::new().respond(Ok(MutationResponse::Comment(created.clone())));
    let toasts = Arc::new(CollectingToasts::new());
    let orchestrator =
        MutationOrchestrator::new(cache.clone(), transport).with_toasts(toasts.clone());

    let outcome = orchestrator
        .execute(SyncAction::CommentCreate(CommentInput {
            post_id: "p1".into(),
            content: "first!".into(),
            author: user("me"),
        }))
        .await;

    assert!(outcome.is_success());
    assert_eq!(
        orchestrator.transport().sent(),
        vec![MutationRequest::CreateComment {
            post_id: "p1".into(),
            content: "first!".into()
        }]
    );

    let comments = records::<CommentRecord>(&cache.get(&comments_key).unwrap().data);
    assert_eq!(comments, vec![created, comment("c1", "p1", "u2")]);

    let posts = records::<PostRecord>(&cache.get(&CacheKey::for_you_feed()).unwrap().data);
    assert_eq!(posts[0].comment_count, 1);

    assert_eq!(toasts.toasts()[0].description, "Your comment has been created!");
}

#[tokio::test]
async fn rejected_action_touches_nothing() {
    let cache = Arc::new(QueryCache::new());
    let comments_key = CacheKey::comment_feed("p1");
    cache.set(comments_key.clone(), feed(vec![comment("c1", "p1", "u2")]));
    let before = cache.get(&comments_key).unwrap();

    let orchestrator = MutationOrchestrator::new(cache.clone(), ScriptedTransport::new());
    let outcome = orchestrator
        .execute(SyncAction::CommentCreate(CommentInput {
            post_id: "p1".into(),
            content: "   ".into(),
            author: user("me"),
        }))
        .await;

    assert_eq!(outcome.status, MutationStatus::Rejected);
    assert!(orchestrator.transport().sent().is_empty());
    assert_eq!(cache.get(&comments_key).unwrap(), before);

    let orchestrator = MutationOrchestrator::new(
        cache.clone(),
        ScriptedTransport::new().without_session(),
    );
    let outcome = orchestrator.execute(like(false)).await;
    assert!(matches!(outcome.error, Some(SyncError::Unauthorized)));
    assert_eq!(orchestrator.stats().rejected, 1);
}

/// Feed whose records carry fields the client models do not know about
fn feed_with_extras(posts: Vec<PostRecord>) -> Value {
    let mut value = feed(posts);
    for record in value["pages"][0]["records"].as_array_mut().unwrap() {
        let (likes, comments) = (record["likeCount"].clone(), record["commentCount"].clone());
        record["_count"] = json!({"likes": likes, "comments": comments});
    }
    value
}

fn snapshot_of(cache: &QueryCache, keys: &[CacheKey]) -> Vec<Value> {
    keys.iter().map(|k| cache.get(k).unwrap().data).collect()
}

#[tokio::test]
async fn like_preserves_records_outside_the_model() {
    let cache = Arc::new(QueryCache::new());
    cache.set(
        CacheKey::for_you_feed(),
        feed_with_extras(vec![post("p1", "u1"), post("p2", "u1")]),
    );
    let mut search = feed(vec![post("p3", "u2")]);
    search["pages"][0]["records"]
        .as_array_mut()
        .unwrap()
        .push(json!({"id": "p4", "content": "draft without timestamp"}));
    cache.set(CacheKey::search_feed("rust"), search.clone());
    let untouched = cache.get(&CacheKey::for_you_feed()).unwrap().data["pages"][0]["records"][1]
        .clone();

    let orchestrator = MutationOrchestrator::new(cache.clone(), ScriptedTransport::new());
    let outcome = orchestrator.execute(like(false)).await;

    assert!(outcome.is_success());
    assert_eq!(orchestrator.transport().sent().len(), 1);
    assert_eq!(outcome.affected_keys, vec![CacheKey::for_you_feed()]);

    let for_you = cache.get(&CacheKey::for_you_feed()).unwrap().data;
    let liked = &for_you["pages"][0]["records"][0];
    assert_eq!(liked["likeCount"], 5);
    assert_eq!(liked["_count"], json!({"likes": 4, "comments": 0}));
    assert_eq!(for_you["pages"][0]["records"][1], untouched);
    assert_eq!(cache.get(&CacheKey::search_feed("rust")).unwrap().data, search);
}

#[tokio::test]
async fn profile_update_success_and_failure() {
    let keys = [
        CacheKey::for_you_feed(),
        CacheKey::user_posts_feed("u1"),
        CacheKey::comment_feed("p2"),
    ];
    let input = ProfileInput {
        user_id: "u1".into(),
        display_name: "Ada".into(),
        bio: Some("Analyst".into()),
        avatar_url: None,
    };

    for fail in [false, true] {
        let cache = Arc::new(QueryCache::new());
        cache.set(keys[0].clone(), feed_with_extras(vec![post("p1", "u1"), post("p2", "u2")]));
        cache.set(keys[1].clone(), feed_with_extras(vec![post("p1", "u1")]));
        cache.set(keys[2].clone(), feed(vec![comment("c1", "p2", "u1")]));
        let before = snapshot_of(&cache, &keys);

        let mut server_user = user("u1");
        server_user.display_name = "Ada Lovelace".into();
        server_user.bio = Some("Analyst".into());
        let transport = ScriptedTransport::new().respond(if fail {
            Err(TransportError::Server {
                status: 503,
                message: "unavailable".into(),
            })
        } else {
            Ok(MutationResponse::User(server_user))
        });
        let toasts = Arc::new(CollectingToasts::new());
        let orchestrator =
            MutationOrchestrator::new(cache.clone(), transport).with_toasts(toasts.clone());

        let outcome = orchestrator
            .execute(SyncAction::ProfileUpdate(input.clone()))
            .await;

        assert_eq!(outcome.affected_keys.len(), 3);
        assert_eq!(outcome.invalidated, 3);
        for key in &keys {
            assert_eq!(cache.is_stale(key), Some(true), "{} not invalidated", key);
        }

        if fail {
            assert_eq!(outcome.status, MutationStatus::Failed);
            assert!(outcome.rolled_back);
            assert_eq!(snapshot_of(&cache, &keys), before);
            assert_eq!(toasts.toasts()[0].description, "Failed to update your profile");
        } else {
            assert!(outcome.is_success());
            let posts = records::<PostRecord>(&cache.get(&keys[0]).unwrap().data);
            assert_eq!(posts[0].user.display_name, "Ada Lovelace");
            assert_eq!(posts[1].user.display_name, "User u2");
            let comments = records::<CommentRecord>(&cache.get(&keys[2]).unwrap().data);
            assert_eq!(comments[0].user.display_name, "Ada Lovelace");
            let own = cache.get(&keys[1]).unwrap().data;
            assert!(own["pages"][0]["records"][0].get("_count").is_some());
            assert_eq!(toasts.toasts()[0].description, "Your profile has been updated");
        }
    }
}

#[tokio::test]
async fn post_delete_success_and_failure() {
    let keys = [
        CacheKey::for_you_feed(),
        CacheKey::following_feed(),
        CacheKey::user_posts_feed("u1"),
    ];

    for fail in [false, true] {
        let cache = Arc::new(QueryCache::new());
        cache.set(keys[0].clone(), feed_with_extras(vec![post("p1", "u1"), post("p2", "u2")]));
        cache.set(keys[1].clone(), feed_with_extras(vec![post("p2", "u2")]));
        cache.set(keys[2].clone(), feed_with_extras(vec![post("p1", "u1")]));
        let before = snapshot_of(&cache, &keys);

        let transport = if fail {
            ScriptedTransport::new().respond(Err(TransportError::Timeout))
        } else {
            ScriptedTransport::new()
        };
        let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
        let outcome = orchestrator
            .execute(SyncAction::PostDelete {
                post_id: "p1".into(),
            })
            .await;

        assert_eq!(
            orchestrator.transport().sent(),
            vec![MutationRequest::DeletePost {
                post_id: "p1".into()
            }]
        );
        // The following feed never held the post
        assert_eq!(outcome.affected_keys.len(), 2);
        assert!(!outcome.affected_keys.contains(&keys[1]));
        assert_eq!(outcome.invalidated, 3);

        if fail {
            assert_eq!(outcome.status, MutationStatus::Failed);
            assert_eq!(snapshot_of(&cache, &keys), before);
        } else {
            assert!(outcome.is_success());
            let ids: Vec<String> = records::<PostRecord>(&cache.get(&keys[0]).unwrap().data)
                .into_iter()
                .map(|p| p.id)
                .collect();
            assert_eq!(ids, vec!["p2"]);
            assert!(records::<PostRecord>(&cache.get(&keys[2]).unwrap().data).is_empty());
            assert_eq!(cache.get(&keys[1]).unwrap().data, before[1]);
        }
        for key in &keys {
            assert_eq!(cache.is_stale(key), Some(true));
        }
    }
}

#[tokio::test]
async fn comment_delete_success_and_failure() {
    let keys = [CacheKey::comment_feed("p1"), CacheKey::for_you_feed()];

    for fail in [false, true] {
        let cache = Arc::new(QueryCache::new());
        cache.set(
            keys[0].clone(),
            feed(vec![comment("c1", "p1", "u2"), comment("c2", "p1", "u3")]),
        );
        let mut commented = post("p1", "u1");
        commented.comment_count = 2;
        cache.set(keys[1].clone(), feed_with_extras(vec![commented]));
        let before = snapshot_of(&cache, &keys);

        let transport = if fail {
            ScriptedTransport::new().respond(Err(TransportError::NotFound("comment".into())))
        } else {
            ScriptedTransport::new()
        };
        let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
        let outcome = orchestrator
            .execute(SyncAction::CommentDelete {
                comment_id: "c1".into(),
                post_id: "p1".into(),
            })
            .await;

        assert_eq!(outcome.affected_keys.len(), 2);
        assert_eq!(outcome.invalidated, 2);

        if fail {
            assert!(matches!(outcome.error, Some(SyncError::NotFound(_))));
            assert!(outcome.rolled_back);
            assert_eq!(snapshot_of(&cache, &keys), before);
        } else {
            assert!(outcome.is_success());
            let comments = records::<CommentRecord>(&cache.get(&keys[0]).unwrap().data);
            assert_eq!(comments, vec![comment("c2", "p1", "u3")]);
            let posts = records::<PostRecord>(&cache.get(&keys[1]).unwrap().data);
            assert_eq!(posts[0].comment_count, 1);
        }
        assert_eq!(cache.is_stale(&keys[0]), Some(true));
        assert_eq!(cache.is_stale(&keys[1]), Some(true));
    }
}

#[tokio::test]
async fn failed_rollback_leaves_untouched_feeds_alone() {
    let cache = Arc::new(QueryCache::new());
    cache.set(CacheKey::like_data("p1"), json!({"likesCount": 4, "isLikedByUser": false}));
    cache.set(CacheKey::following_feed(), feed(vec![post("p2", "u2")]));

    // A refetch of the following feed lands while the like is in flight
    let refreshed = feed(vec![post("p2", "u2"), post("p3", "u2")]);
    let transport = {
        let cache = cache.clone();
        let refreshed = refreshed.clone();
        ScriptedTransport::new()
            .respond(Err(TransportError::Timeout))
            .observe(move |_| cache.set(CacheKey::following_feed(), refreshed.clone()))
    };
    let orchestrator = MutationOrchestrator::new(cache.clone(), transport);
    let outcome = orchestrator.execute(like(false)).await;

    assert_eq!(outcome.status, MutationStatus::Failed);
    assert_eq!(outcome.affected_keys, vec![CacheKey::like_data("p1")]);
    assert_eq!(
        cache.get(&CacheKey::like_data("p1")).unwrap().data,
        json!({"likesCount": 4, "isLikedByUser": false})
    );
    assert_eq!(cache.get(&CacheKey::following_feed()).unwrap().data, refreshed);
}
