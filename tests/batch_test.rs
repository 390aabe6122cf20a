//! Tests for BatchService against a mocked OpenList server.

use std::sync::{Arc, Mutex};

use mockito::{Matcher, Server};
use serde_json::{json, Value};

use openlist_batch::config::{Auth, Tenant};
use openlist_batch::models::{AliyunShareAddition, PikPakShareAddition};
use openlist_batch::{
    AliyunShare, BatchError, BatchService, Config, ConfigSaver, OnedriveApp, PikPakShare,
    Provider, Result, ShareList,
};

const LIST: &str = "/api/admin/storage/list";
const CREATE: &str = "/api/admin/storage/create";
const UPDATE: &str = "/api/admin/storage/update";
const DELETE: &str = "/api/admin/storage/delete";
const LOGIN: &str = "/api/auth/login";

/// Saver that keeps every saved config in memory.
#[derive(Default)]
struct RecordingSaver {
    saved: Mutex<Vec<Config>>,
    fail: bool,
}

impl ConfigSaver for RecordingSaver {
    fn save_config(&self, config: &Config) -> Result<()> {
        if self.fail {
            return Err(BatchError::InvalidConfig("read-only work dir".to_string()));
        }
        self.saved.lock().unwrap().push(config.clone());
        Ok(())
    }
}

fn config(url: &str) -> Config {
    Config {
        url: url.to_string(),
        token: "tok".to_string(),
        timeout_secs: 5,
        auth: Auth {
            username: "admin".to_string(),
            password: "pw".to_string(),
        },
        ..Default::default()
    }
}

fn service(url: &str, saver: Arc<RecordingSaver>) -> BatchService {
    BatchService::new(config(url), saver).unwrap()
}

fn api_body(code: i64, message: &str, data: Value) -> String {
    json!({ "code": code, "message": message, "data": data }).to_string()
}

fn ok_body(data: Value) -> String {
    api_body(200, "success", data)
}

fn list_body(items: Vec<Value>) -> String {
    let total = items.len();
    ok_body(json!({ "content": items, "total": total }))
}

fn share_list(entries: &[(&str, &str, &str)]) -> ShareList {
    let mut list = ShareList::new();
    for (category, name, descriptor) in entries {
        list.entry(category.to_string())
            .or_default()
            .insert(name.to_string(), descriptor.to_string());
    }
    list
}

mod token {
    use super::*;

    #[tokio::test]
    async fn validate_accepts_code_200() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", LIST)
            .match_header("authorization", "tok")
            .with_body(list_body(vec![]))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        assert!(service.validate_token().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn validate_rejects_logical_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_status(200)
            .with_body(api_body(401, "token is expired", Value::Null))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        assert!(!service.validate_token().await);
    }

    #[tokio::test]
    async fn validate_rejects_non_json_body() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body("<html>gateway</html>")
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        assert!(!service.validate_token().await);
    }

    #[tokio::test]
    async fn validate_rejects_transport_error() {
        let service = service("http://127.0.0.1:1", Arc::default());
        assert!(!service.validate_token().await);
    }

    #[tokio::test]
    async fn refresh_updates_session_and_persists() {
        let mut server = Server::new_async().await;
        let login = server
            .mock("POST", LOGIN)
            .match_header("content-type", Matcher::Regex("application/json".to_string()))
            .match_body(Matcher::Json(json!({ "username": "admin", "password": "pw" })))
            .with_body(ok_body(json!({ "token": "fresh" })))
            .create_async()
            .await;
        let list = server
            .mock("GET", LIST)
            .match_header("authorization", "fresh")
            .with_body(list_body(vec![]))
            .create_async()
            .await;

        let saver = Arc::new(RecordingSaver::default());
        let mut service = service(&server.url(), saver.clone());
        service.refresh_token().await.unwrap();

        assert_eq!(service.config().token, "fresh");
        assert!(service.validate_token().await);
        login.assert_async().await;
        list.assert_async().await;

        let saved = saver.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].token, "fresh");
    }

    #[tokio::test]
    async fn refresh_rejected_login() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", LOGIN)
            .with_body(api_body(400, "password is incorrect", Value::Null))
            .create_async()
            .await;

        let saver = Arc::new(RecordingSaver::default());
        let mut service = service(&server.url(), saver.clone());

        match service.refresh_token().await {
            Err(BatchError::AuthenticationError(message)) => {
                assert_eq!(message, "password is incorrect")
            }
            other => panic!("expected AuthenticationError, got {:?}", other),
        }
        assert!(saver.saved.lock().unwrap().is_empty());
        assert_eq!(service.config().token, "tok");
    }

    #[tokio::test]
    async fn refresh_malformed_token_payload() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", LOGIN)
            .with_body(ok_body(json!({ "jwt": 1 })))
            .create_async()
            .await;

        let mut service = service(&server.url(), Arc::default());
        assert!(matches!(
            service.refresh_token().await,
            Err(BatchError::DecodeError(_))
        ));
    }

    #[tokio::test]
    async fn refresh_persist_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", LOGIN)
            .with_body(ok_body(json!({ "token": "fresh" })))
            .create_async()
            .await;

        let saver = Arc::new(RecordingSaver {
            fail: true,
            ..Default::default()
        });
        let mut service = service(&server.url(), saver);
        assert!(matches!(
            service.refresh_token().await,
            Err(BatchError::PersistError(_))
        ));
    }
}

mod batch_add {
    use super::*;

    #[tokio::test]
    async fn failures_are_isolated_per_entry() {
        let mut server = Server::new_async().await;
        let accepted = server
            .mock("POST", CREATE)
            .match_body(Matcher::Regex(r#""mount_path":"/ok/"#.to_string()))
            .with_body(ok_body(Value::Null))
            .expect(3)
            .create_async()
            .await;
        let rejected = server
            .mock("POST", CREATE)
            .match_body(Matcher::Regex(r#""mount_path":"/dup/"#.to_string()))
            .with_body(api_body(500, "storage already exists", Value::Null))
            .expect(1)
            .create_async()
            .await;

        let shares = share_list(&[
            ("ok", "a", "https://mypikpak.com/s/VNa"),
            ("ok", "b", "https://mypikpak.com/s/VNb/VNf"),
            ("ok", "c", "https://mypikpak.com/s/VNc?pwd=1"),
            ("dup", "d", "https://mypikpak.com/s/VNd"),
            ("bad", "e", "not a link"),
            ("bad", "f", "https://mypikpak.com/"),
        ]);

        let service = service(&server.url(), Arc::default());
        let summary = service.batch_add_shares(&PikPakShare::default(), &shares).await;

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.total(), 6);
        accepted.assert_async().await;
        rejected.assert_async().await;
    }

    #[tokio::test]
    async fn sends_movies_scenario_request() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", CREATE)
            .match_header("authorization", "tok")
            .match_body(Matcher::PartialJson(json!({
                "mount_path": "/movies/foo",
                "driver": "AliyundriveShare",
                "cache_expiration": 30,
                "webdav_policy": "302_redirect"
            })))
            .with_body(ok_body(Value::Null))
            .create_async()
            .await;

        let shares = share_list(&[(
            "movies",
            "foo",
            "https://www.aliyundrive.com/s/ShareABC/folder/FolderXYZ?pwd=1234",
        )]);

        let service = service(&server.url(), Arc::default());
        let summary = service.batch_add_shares(&AliyunShare::new("RT1"), &shares).await;

        assert_eq!(summary.succeeded, 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn transport_failure_counts_every_entry() {
        let shares = share_list(&[
            ("ok", "a", "https://mypikpak.com/s/VNa"),
            ("ok", "b", "https://mypikpak.com/s/VNb"),
        ]);

        let service = service("http://127.0.0.1:1", Arc::default());
        let summary = service.batch_add_shares(&PikPakShare::default(), &shares).await;
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 2);
    }

    #[tokio::test]
    async fn apps_use_tenant_list() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", CREATE)
            .match_body(Matcher::PartialJson(json!({ "driver": "OnedriveAPP" })))
            .with_body(ok_body(Value::Null))
            .expect(2)
            .create_async()
            .await;

        let provider = OnedriveApp::new(
            "global",
            vec![Tenant {
                id: 1,
                client_id: "cid".to_string(),
                client_secret: "secret".to_string(),
                tenant_id: "tid".to_string(),
            }],
        );
        let apps = share_list(&[
            ("office", "alice", "1:alice@contoso.com"),
            ("office", "bob", "1:bob@contoso.com:/Shared"),
            ("office", "carol", "2:carol@contoso.com"),
        ]);

        let service = service(&server.url(), Arc::default());
        let summary = service.batch_add_apps(&provider, &apps).await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 1);
        mock.assert_async().await;
    }
}

mod storages {
    use super::*;

    fn item(id: u64, mount_path: &str, driver: &str, disabled: bool, addition: String) -> Value {
        json!({
            "id": id,
            "mount_path": mount_path,
            "driver": driver,
            "disabled": disabled,
            "status": "work",
            "cache_expiration": 30,
            "webdav_policy": "302_redirect",
            "modified": "2024-05-01T12:30:00+08:00",
            "addition": addition
        })
    }

    fn aliyun_addition(token: &str, share_id: &str) -> String {
        serde_json::to_string(&AliyunShareAddition {
            refresh_token: token.to_string(),
            share_id: share_id.to_string(),
            root_folder_id: "root".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    fn pikpak_addition(share_id: &str, folder_id: &str, pwd: &str) -> String {
        serde_json::to_string(&PikPakShareAddition {
            share_id: share_id.to_string(),
            root_folder_id: folder_id.to_string(),
            share_pwd: pwd.to_string(),
            platform: "android".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    async fn delete_mock(server: &mut Server, id: &str, code: i64, hits: usize) -> mockito::Mock {
        server
            .mock("POST", DELETE)
            .match_query(Matcher::UrlEncoded("id".to_string(), id.to_string()))
            .with_body(api_body(code, "", Value::Null))
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn list_decodes_items() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![
                item(1, "/a/b", "PikPakShare", false, pikpak_addition("S", "", "")),
                item(2, "/c/d", "AliyundriveShare", true, aliyun_addition("RT", "S2")),
            ]))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        let list = service.list_storages().await.unwrap();

        assert_eq!(list.total, 2);
        assert_eq!(list.content[0].mount_path, "/a/b");
        assert!(list.content[1].disabled);
    }

    #[tokio::test]
    async fn list_surfaces_remote_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(api_body(403, "permission denied", Value::Null))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        assert!(matches!(
            service.list_storages().await,
            Err(BatchError::ApiError { code: 403, .. })
        ));
    }

    #[tokio::test]
    async fn delete_disabled_continues_after_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![
                item(1, "/a/one", "PikPakShare", true, String::new()),
                item(2, "/a/two", "PikPakShare", false, String::new()),
                item(3, "/a/three", "PikPakShare", true, String::new()),
            ]))
            .create_async()
            .await;
        let first = delete_mock(&mut server, "1", 500, 1).await;
        let untouched = delete_mock(&mut server, "2", 200, 0).await;
        let third = delete_mock(&mut server, "3", 200, 1).await;

        let service = service(&server.url(), Arc::default());
        let summary = service.delete_disabled_storages().await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        first.assert_async().await;
        untouched.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn delete_all_removes_everything() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![
                item(4, "/a/one", "PikPakShare", false, String::new()),
                item(5, "/a/two", "AliyundriveShare", true, String::new()),
            ]))
            .create_async()
            .await;
        let four = delete_mock(&mut server, "4", 200, 1).await;
        let five = delete_mock(&mut server, "5", 200, 1).await;

        let service = service(&server.url(), Arc::default());
        let summary = service.delete_all_storages().await.unwrap();

        assert_eq!(summary.succeeded, 2);
        four.assert_async().await;
        five.assert_async().await;
    }

    #[tokio::test]
    async fn delete_by_id() {
        let mut server = Server::new_async().await;
        let seven = delete_mock(&mut server, "7", 200, 1).await;
        let eight = delete_mock(&mut server, "8", 404, 1).await;

        let service = service(&server.url(), Arc::default());
        let summary = service.delete_storages_by_id(&[7, 8]).await;

        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        seven.assert_async().await;
        eight.assert_async().await;
    }

    #[tokio::test]
    async fn update_credential_touches_matching_driver_only() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![
                item(1, "/ali/one", "AliyundriveShare", false, aliyun_addition("OLD", "S1")),
                item(2, "/pik/two", "PikPakShare", false, pikpak_addition("P2", "", "")),
                item(3, "/ali/three", "AliyundriveShare", true, aliyun_addition("OLD", "S3")),
            ]))
            .create_async()
            .await;

        let mut updates = Vec::new();
        for (id, mount_path) in [(1, "/ali/one"), (3, "/ali/three")] {
            let mock = server
                .mock("POST", UPDATE)
                .match_body(Matcher::AllOf(vec![
                    Matcher::PartialJson(json!({
                        "id": id,
                        "status": "work",
                        "mount_path": mount_path,
                        "driver": "AliyundriveShare"
                    })),
                    Matcher::Regex(r#"\\"refresh_token\\":\\"RT-NEW\\""#.to_string()),
                ]))
                .with_body(ok_body(Value::Null))
                .expect(1)
                .create_async()
                .await;
            updates.push(mock);
        }
        let pikpak = server
            .mock("POST", UPDATE)
            .match_body(Matcher::PartialJson(json!({ "id": 2 })))
            .with_body(ok_body(Value::Null))
            .expect(0)
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        let provider = AliyunShare::new("RT-NEW");
        let summary = service.update_credential(&provider, "RT-NEW").await.unwrap();

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 0);
        for mock in updates {
            mock.assert_async().await;
        }
        pikpak.assert_async().await;
    }

    #[tokio::test]
    async fn export_rebuilds_share_links() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![
                item(1, "/movies/foo", "PikPakShare", false, pikpak_addition("VNs", "VNf", "1234")),
                item(2, "/movies/bar", "PikPakShare", false, pikpak_addition("VNb", "", "")),
                item(3, "/lonely", "PikPakShare", false, pikpak_addition("VNx", "", "")),
                item(4, "/tv/broken", "PikPakShare", false, "{oops".to_string()),
                item(5, "/ali/one", "AliyundriveShare", false, aliyun_addition("RT", "S1")),
            ]))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        let shares = service.export_by_driver("PikPakShare").await.unwrap();

        assert_eq!(shares.len(), 1);
        let movies = &shares["movies"];
        assert_eq!(movies.len(), 2);
        assert_eq!(movies["foo"], "https://mypikpak.com/s/VNs/VNf?pwd=1234");
        assert_eq!(movies["bar"], "https://mypikpak.com/s/VNb");

        let rebuilt = PikPakShare::default()
            .build_request("/movies/foo", &movies["foo"])
            .unwrap();
        let addition: PikPakShareAddition = serde_json::from_str(&rebuilt.addition).unwrap();
        assert_eq!(addition.share_id, "VNs");
        assert_eq!(addition.root_folder_id, "VNf");
        assert_eq!(addition.share_pwd, "1234");
    }

    #[tokio::test]
    async fn export_aliyun_shares() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", LIST)
            .with_body(list_body(vec![item(
                5,
                "/ali/one",
                "AliyundriveShare",
                false,
                aliyun_addition("RT", "S1"),
            )]))
            .create_async()
            .await;

        let service = service(&server.url(), Arc::default());
        let shares = service.export_by_driver("AliyundriveShare").await.unwrap();
        assert_eq!(shares["ali"]["one"], "https://www.aliyundrive.com/s/S1/folder/root");
    }
}
