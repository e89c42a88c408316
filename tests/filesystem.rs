// ABOUTME: Integration tests for shell filesystem operations on a local target.
// ABOUTME: Covers symlink promotion, shared-folder moves, and swap atomicity.

mod support;

use skyhook::config::{AtomicSymlinks, SymlinkMode};
use skyhook::connection::LocalConnection;
use skyhook::paths::Paths;
use skyhook::shell::Shell;
use skyhook::types::ApplicationName;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use support::MockConnection;

fn local_shell(root: &Path) -> Shell {
    let paths = Paths::new(root.to_str().unwrap(), ApplicationName::new("demo").unwrap());
    Shell::new(Arc::new(LocalConnection::new()), paths)
}

fn mock_shell(connection: Arc<MockConnection>) -> Shell {
    let paths = Paths::new("/srv", ApplicationName::new("demo").unwrap());
    Shell::new(connection, paths)
}

#[tokio::test]
async fn folders_are_created_listed_and_removed() {
    support::init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());

    assert!(shell.create_folder("releases/a", true).await.unwrap().success());
    assert!(shell.create_folder("releases/b", true).await.unwrap().success());
    assert!(shell.file_exists(&shell.paths().folder("releases/a")).await);

    let mut entries = shell
        .list_contents(&shell.paths().releases_folder())
        .await
        .unwrap();
    entries.sort();
    assert_eq!(entries, vec!["a", "b"]);

    assert!(shell.remove_folder(["releases/a"]).await.unwrap().success());
    assert!(!shell.file_exists(&shell.paths().folder("releases/a")).await);
}

#[tokio::test]
async fn listing_a_missing_folder_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());

    let entries = shell.list_contents("/nonexistent/skyhook").await.unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn symlink_replaces_an_existing_link() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());
    let first = shell.paths().folder("releases/first");
    let second = shell.paths().folder("releases/second");
    let current = shell.paths().current_folder();
    shell.create_folder(&first, true).await.unwrap();
    shell.create_folder(&second, true).await.unwrap();

    shell.symlink(&first, &current).await.unwrap().unwrap();
    assert_eq!(std::fs::read_link(&current).unwrap(), Path::new(&first));

    let output = shell.symlink(&second, &current).await.unwrap().unwrap();
    assert!(output.success(), "swap failed: {}", output.error_text());
    assert_eq!(std::fs::read_link(&current).unwrap(), Path::new(&second));
    assert!(!Path::new(&format!("{}-temp", current)).exists());
}

#[tokio::test]
async fn relative_links_point_inside_the_application() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path()).symlink_mode(SymlinkMode::Relative);
    let release = shell.paths().folder("releases/20240301120000");
    let current = shell.paths().current_folder();
    shell.create_folder(&release, true).await.unwrap();

    shell.symlink(&release, &current).await.unwrap().unwrap();

    assert_eq!(
        std::fs::read_link(&current).unwrap(),
        Path::new("releases/20240301120000")
    );
    assert!(Path::new(&current).is_dir());
}

#[tokio::test]
async fn a_real_folder_at_the_link_moves_to_the_target() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());
    let link = shell.paths().folder("releases/one/storage");
    let shared = shell.paths().shared_folder("storage");
    shell.create_folder(&link, true).await.unwrap();
    std::fs::write(format!("{}/app.log", link), "log").unwrap();

    shell.symlink(&shared, &link).await.unwrap().unwrap();

    assert!(shell.is_symlink(&link).await);
    assert_eq!(
        std::fs::read_to_string(format!("{}/app.log", shared)).unwrap(),
        "log"
    );
}

#[tokio::test]
async fn symlink_without_target_or_link_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());

    let result = shell
        .symlink(
            &shell.paths().folder("releases/missing"),
            &shell.paths().current_folder(),
        )
        .await
        .unwrap();

    assert!(result.is_none());
    assert!(!Path::new(&shell.paths().current_folder()).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn current_never_disappears_while_swapping() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path()).atomic_symlinks(AtomicSymlinks::Always);
    let first = shell.paths().folder("releases/first");
    let second = shell.paths().folder("releases/second");
    let current = shell.paths().current_folder();
    shell.create_folder(&first, true).await.unwrap();
    shell.create_folder(&second, true).await.unwrap();
    shell.symlink(&first, &current).await.unwrap().unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let observer = {
        let done = done.clone();
        let current = current.clone();
        std::thread::spawn(move || {
            let mut misses = 0;
            while !done.load(Ordering::SeqCst) {
                if !Path::new(&current).is_dir() {
                    misses += 1;
                }
            }
            misses
        })
    };

    for round in 0..20 {
        let target = if round % 2 == 0 { &second } else { &first };
        let output = shell.symlink(target, &current).await.unwrap().unwrap();
        assert!(output.success());
    }
    done.store(true, Ordering::SeqCst);

    assert_eq!(observer.join().unwrap(), 0, "current was missing mid-swap");
}

#[tokio::test]
async fn linux_targets_swap_with_a_rename() {
    let connection = Arc::new(
        MockConnection::new("web1")
            .respond("[ -e", "true")
            .respond("[ -L", "true"),
    );
    let shell = mock_shell(connection.clone());

    shell
        .symlink("/srv/demo/releases/1", "/srv/demo/current")
        .await
        .unwrap();

    assert!(connection.ran(
        "ln -sfn /srv/demo/releases/1 /srv/demo/current-temp && mv -Tf /srv/demo/current-temp /srv/demo/current"
    ));
    assert!(!connection.ran("rm -rf"));
}

#[tokio::test]
async fn other_targets_fall_back_to_remove_and_link() {
    let connection = Arc::new(
        MockConnection::new("mac")
            .os("Darwin")
            .respond("[ -e", "true"),
    );
    let shell = mock_shell(connection.clone());

    shell
        .symlink("/srv/demo/releases/1", "/srv/demo/current")
        .await
        .unwrap();

    assert!(connection.ran("rm -rf /srv/demo/current"));
    assert!(connection.ran("ln -s /srv/demo/releases/1 /srv/demo/current"));
    assert!(!connection.ran("mv -Tf"));
}

#[tokio::test]
async fn binary_lookups_are_cached() {
    let connection =
        Arc::new(MockConnection::new("web1").respond("command -v git", "/usr/bin/git\n"));
    let shell = mock_shell(connection.clone());

    for _ in 0..2 {
        let found = shell.which("git").await.unwrap();
        assert_eq!(found.as_deref(), Some("/usr/bin/git"));
    }

    let lookups = connection
        .commands()
        .iter()
        .filter(|c| c.contains("command -v git"))
        .count();
    assert_eq!(lookups, 1);
}

#[tokio::test]
async fn files_are_written_read_and_uploaded() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());
    let env_file = dir.path().join(".env").to_str().unwrap().to_string();

    shell.put_file(&env_file, "APP_ENV=production\n").await.unwrap();
    assert_eq!(shell.get_file(&env_file).await.unwrap(), "APP_ENV=production\n");

    let destination = dir.path().join("uploaded.env").to_str().unwrap().to_string();
    let uploaded = shell
        .upload(Path::new(&env_file), Some(&destination))
        .await
        .unwrap();
    assert!(uploaded);
    assert_eq!(
        std::fs::read_to_string(&destination).unwrap(),
        "APP_ENV=production\n"
    );
}

#[tokio::test]
async fn uploading_a_missing_file_does_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let shell = local_shell(dir.path());

    let uploaded = shell
        .upload(&dir.path().join("missing.tar.gz"), None)
        .await
        .unwrap();

    assert!(!uploaded);
}
