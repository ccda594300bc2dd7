fn main() {
    println!("Run `cargo test -p loopback-tests` to execute end-to-end transfer tests.");
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use shareport_client::{ClientConfig, ClientError, ClientState, TransferClient};
    use shareport_protocol::CHUNK_SIZE;
    use shareport_server::{CatalogService, ServerConfig};

    async fn started_service(
        share_dir: &Path,
    ) -> (Arc<CatalogService<()>>, tokio::task::JoinHandle<()>, u16) {
        let config = ServerConfig {
            bind_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 0,
            share_dir: share_dir.to_path_buf(),
        };
        let service = CatalogService::new(config, ());
        let runner = Arc::clone(&service);
        let handle = tokio::spawn(async move {
            runner.run().await.unwrap();
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        let port = service.port().await;
        assert!(port > 0);
        (service, handle, port)
    }

    fn client_for(port: u16) -> TransferClient<()> {
        TransferClient::new(
            ClientConfig {
                host: "127.0.0.1".into(),
                port,
                ..ClientConfig::default()
            },
            (),
        )
    }

    #[tokio::test]
    async fn single_file_transfer_end_to_end() {
        let share = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        // 12,345 bytes: ceil(12345 / 4096) = 4 chunks on the wire.
        let payload: Vec<u8> = (0..12_345u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(share.path().join("report.pdf"), &payload).unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        let mut client = client_for(port);
        let catalog = client.connect().await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].name, "report.pdf");
        assert_eq!(catalog[0].size, 12_345);

        let mut events = Vec::new();
        let progress = client
            .download("report.pdf", dest.path(), |p| events.push(p))
            .await
            .unwrap();

        assert_eq!(progress.bytes_received, 12_345);
        assert_eq!(progress.total_bytes, 12_345);
        assert_eq!(client.state(), ClientState::Closed);

        // Monotone progress, at most one chunk per step, at least 4 steps.
        assert!(events.len() >= 4);
        let mut last = 0;
        for p in &events {
            assert!(p.bytes_received > last);
            assert!(p.bytes_received - last <= CHUNK_SIZE as u64);
            last = p.bytes_received;
        }
        assert_eq!(last, 12_345);

        // Byte-for-byte equality between source and destination.
        let written = std::fs::read(dest.path().join("report.pdf")).unwrap();
        assert_eq!(written, payload);

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn empty_share_directory_reports_no_files() {
        let share = tempfile::tempdir().unwrap();
        let (service, handle, port) = started_service(share.path()).await;

        let mut client = client_for(port);
        let catalog = client.connect().await.unwrap();

        assert!(catalog.is_empty());
        assert!(!client.is_connected());
        assert_eq!(client.state(), ClientState::Closed);

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn requesting_nonexistent_file_fails_cleanly() {
        let share = tempfile::tempdir().unwrap();
        std::fs::write(share.path().join("present.txt"), b"here").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        let mut client = client_for(port);
        client.connect().await.unwrap();

        let result = client.download("absent.txt", dest.path(), |_| {}).await;
        match result {
            Err(ClientError::RemoteFileNotFound(msg)) => assert_eq!(msg, "File not found"),
            other => panic!("expected RemoteFileNotFound, got {other:?}"),
        }

        // No destination file was created for the failed request.
        assert!(!dest.path().join("absent.txt").exists());

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stale_catalog_entry_resolves_to_not_found() {
        let share = tempfile::tempdir().unwrap();
        std::fs::write(share.path().join("fleeting.txt"), b"soon gone").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        let mut client = client_for(port);
        let catalog = client.connect().await.unwrap();
        assert_eq!(catalog[0].name, "fleeting.txt");

        // The file disappears between catalog and request.
        std::fs::remove_file(share.path().join("fleeting.txt")).unwrap();

        let result = client.download("fleeting.txt", dest.path(), |_| {}).await;
        assert!(matches!(result, Err(ClientError::RemoteFileNotFound(_))));

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn empty_file_transfers_successfully() {
        let share = tempfile::tempdir().unwrap();
        std::fs::write(share.path().join("empty.dat"), b"").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        let mut client = client_for(port);
        client.connect().await.unwrap();

        let progress = client.download("empty.dat", dest.path(), |_| {}).await.unwrap();
        assert_eq!(progress.bytes_received, 0);
        assert_eq!(progress.total_bytes, 0);

        let written = std::fs::read(dest.path().join("empty.dat")).unwrap();
        assert!(written.is_empty());

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_clients_download_independently() {
        let share = tempfile::tempdir().unwrap();
        let payload_a: Vec<u8> = vec![0x11; 50_000];
        let payload_b: Vec<u8> = vec![0x22; 80_000];
        std::fs::write(share.path().join("a.bin"), &payload_a).unwrap();
        std::fs::write(share.path().join("b.bin"), &payload_b).unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        let dest_a = tempfile::tempdir().unwrap();
        let dest_b = tempfile::tempdir().unwrap();
        let path_a = dest_a.path().to_path_buf();
        let path_b = dest_b.path().to_path_buf();

        let task_a = tokio::spawn(async move {
            let mut client = client_for(port);
            client.connect().await.unwrap();
            client.download("a.bin", &path_a, |_| {}).await.unwrap()
        });
        let task_b = tokio::spawn(async move {
            let mut client = client_for(port);
            client.connect().await.unwrap();
            client.download("b.bin", &path_b, |_| {}).await.unwrap()
        });

        let (done_a, done_b) = (task_a.await.unwrap(), task_b.await.unwrap());
        assert_eq!(done_a.bytes_received, 50_000);
        assert_eq!(done_b.bytes_received, 80_000);

        assert_eq!(
            std::fs::read(dest_a.path().join("a.bin")).unwrap(),
            payload_a
        );
        assert_eq!(
            std::fs::read(dest_b.path().join("b.bin")).unwrap(),
            payload_b
        );

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn sequential_downloads_reconnect_per_file() {
        let share = tempfile::tempdir().unwrap();
        std::fs::write(share.path().join("one.txt"), b"first file").unwrap();
        std::fs::write(share.path().join("two.txt"), b"second file").unwrap();
        let dest = tempfile::tempdir().unwrap();

        let (service, handle, port) = started_service(share.path()).await;

        // One file per connection: each download consumes the session.
        let mut client = client_for(port);
        client.connect().await.unwrap();
        client.download("one.txt", dest.path(), |_| {}).await.unwrap();
        assert!(!client.is_connected());

        client.connect().await.unwrap();
        client.download("two.txt", dest.path(), |_| {}).await.unwrap();

        assert_eq!(
            std::fs::read(dest.path().join("one.txt")).unwrap(),
            b"first file"
        );
        assert_eq!(
            std::fs::read(dest.path().join("two.txt")).unwrap(),
            b"second file"
        );

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn abort_sessions_interrupts_midstream_transfer() {
        let share = tempfile::tempdir().unwrap();
        // Large enough that the transfer cannot fit in socket buffers.
        let payload = vec![0x5Au8; 32 * 1024 * 1024];
        std::fs::write(share.path().join("huge.bin"), &payload).unwrap();
        let dest = tempfile::tempdir().unwrap();
        let dest_path = dest.path().to_path_buf();

        let (service, handle, port) = started_service(share.path()).await;

        let (first_chunk_tx, mut first_chunk_rx) = tokio::sync::mpsc::unbounded_channel();
        let download = tokio::spawn(async move {
            let mut client = client_for(port);
            client.connect().await.unwrap();
            client
                .download("huge.bin", &dest_path, move |p| {
                    let _ = first_chunk_tx.send(p);
                })
                .await
        });

        // Abort the server-side session once the stream is flowing.
        first_chunk_rx.recv().await.unwrap();
        service.abort_sessions().await;

        let result = download.await.unwrap();
        match result {
            Err(ClientError::IncompleteTransfer { received, total }) => {
                assert!(received < total);
                assert_eq!(total, payload.len() as u64);

                // The partial file holds exactly the received bytes.
                let meta = std::fs::metadata(dest.path().join("huge.bin")).unwrap();
                assert_eq!(meta.len(), received);
            }
            other => panic!("expected IncompleteTransfer, got {other:?}"),
        }

        service.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn stop_is_prompt_with_no_clients() {
        let share = tempfile::tempdir().unwrap();
        let (service, handle, _port) = started_service(share.path()).await;

        service.stop();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("accept loop should stop promptly")
            .unwrap();
    }
}
