//! End-to-end tests: real metadata and storage servers over loopback TCP,
//! driven through the public client API.

use std::sync::Arc;

use tdfs_meta_service::{MetaServiceHandler, MetaServiceImpl, RpcNodePinger};
use tdfs_net::Server;
use tdfs_net_tcp::TcpListener;
use tdfs_storage_service::{FileStore, StorageServiceHandler, StorageServiceImpl};
use tdfs_types::Address;
use tempfile::TempDir;

use crate::config::ClientConfig;
use crate::walk::distributed_grep;
use crate::DfsClient;

async fn start_storage_server(dir: &TempDir) -> (Address, Server) {
    let service = Arc::new(StorageServiceImpl::new(FileStore::new(dir.path())));
    let mut server = Server::new();
    server.register_service(Box::new(StorageServiceHandler::new(service)));

    let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
    let addr = listener.local_address();
    server.start(listener);
    (addr, server)
}

async fn start_meta_server(storage_addrs: &[Address]) -> (Address, Server, Arc<MetaServiceImpl>) {
    let service = Arc::new(MetaServiceImpl::new(Arc::new(RpcNodePinger::new())));
    for addr in storage_addrs {
        service.register_storage_node(*addr).await.unwrap();
    }

    let mut server = Server::new();
    server.register_service(Box::new(MetaServiceHandler::new(Arc::clone(&service))));

    let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
    let addr = listener.local_address();
    server.start(listener);
    (addr, server, service)
}

fn client_for(meta_addr: Address) -> Arc<DfsClient> {
    Arc::new(DfsClient::connect(ClientConfig {
        meta_addr,
        ..Default::default()
    }))
}

const POEM: &[u8] = b"Two roads diverged in a yellow wood,\n\
    And sorry I could not travel both\n\
    Two roads diverged in a wood, and I\n\
    I took the one less traveled by\n";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_create_read_list_cycle() {
    let storage_dir = TempDir::new().unwrap();
    let (storage_addr, mut storage_server) = start_storage_server(&storage_dir).await;
    let (meta_addr, mut meta_server, _svc) = start_meta_server(&[storage_addr]).await;

    let client = client_for(meta_addr);
    client.ping().await.unwrap();

    client.mkdir("a").await.unwrap();
    client.mkdir("a/b").await.unwrap();

    let written = client.create_file("a/b/f1.txt", POEM).await.unwrap();
    assert_eq!(written, POEM.len() as u64);

    // Location was recorded at creation time; reading goes through it.
    let data = client.get_file("a/b/f1.txt").await.unwrap();
    assert_eq!(data, POEM);

    let listing = client.read_dir_all("a/b").await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "f1.txt");
    assert_eq!(listing[0].size, POEM.len() as u64);
    assert_eq!(listing[0].owner, Some(storage_addr));

    meta_server.stop();
    storage_server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_placement_spreads_across_real_nodes() {
    let dir_a = TempDir::new().unwrap();
    let dir_b = TempDir::new().unwrap();
    let (addr_a, mut server_a) = start_storage_server(&dir_a).await;
    let (addr_b, mut server_b) = start_storage_server(&dir_b).await;
    let (meta_addr, mut meta_server, svc) = start_meta_server(&[addr_a, addr_b]).await;

    let client = client_for(meta_addr);
    for i in 0..6 {
        let name = format!("f{}.txt", i);
        client.create_file(&name, b"equal size").await.unwrap();
    }

    let loads: Vec<u64> = svc.storage_nodes().iter().map(|n| n.assigned_load).collect();
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0], loads[1]);

    meta_server.stop();
    server_a.stop();
    server_b.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_distributed_grep_over_tree() {
    let storage_dir = TempDir::new().unwrap();
    let (storage_addr, mut storage_server) = start_storage_server(&storage_dir).await;
    let (meta_addr, mut meta_server, _svc) = start_meta_server(&[storage_addr]).await;

    let client = client_for(meta_addr);
    client.mkdir("docs").await.unwrap();
    client.mkdir("docs/poems").await.unwrap();
    client.create_file("docs/poems/frost.txt", POEM).await.unwrap();
    client.create_file("docs/readme.txt", b"roads are roads").await.unwrap();

    let count = distributed_grep(Arc::clone(&client), ".", "roads").await.unwrap();
    // Two in the poem, two in the readme.
    assert_eq!(count, 4);

    meta_server.stop();
    storage_server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_delete_all_data_resets_namespace() {
    let storage_dir = TempDir::new().unwrap();
    let (storage_addr, mut storage_server) = start_storage_server(&storage_dir).await;
    let (meta_addr, mut meta_server, _svc) = start_meta_server(&[storage_addr]).await;

    let client = client_for(meta_addr);
    client.mkdir("a").await.unwrap();
    client.create_file("a/f.txt", b"x").await.unwrap();

    client.delete_all_data().await.unwrap();

    assert!(client.read_dir_all(".").await.unwrap().is_empty());
    assert!(client.get_file("a/f.txt").await.is_err());

    meta_server.stop();
    storage_server.stop();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_registration_rejects_dead_node() {
    // Nothing listens on this address (bound, then dropped).
    let dead_addr = {
        let listener = TcpListener::bind(Address::localhost(0)).await.unwrap();
        listener.local_address()
    };

    let service = MetaServiceImpl::new(Arc::new(RpcNodePinger::new()));
    let err = service.register_storage_node(dead_addr).await.unwrap_err();
    assert_ne!(err.code(), 0);
    assert!(service.storage_nodes().is_empty());
}
