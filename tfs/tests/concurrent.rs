//! Concurrent workloads driving the engine from many worker threads.

use std::{
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};

use tfs::{Fs, sync::Access};
use tfs_types::{InodeType, Path, PathBuf};

fn tree(fs: &Fs) -> String {
    let mut out = Vec::new();
    fs.write_tree(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// The tree reachable from the root must account for every live inode:
/// nothing dangling, nothing leaked.
#[track_caller]
fn check_no_leaks(fs: &Fs) {
    assert_eq!(tree(fs).lines().count(), fs.live_inodes());
}

#[test]
fn test_create_remove_storm() {
    const WORKERS: usize = 8;
    const FILES: usize = 1000;

    let fs = Fs::new();
    fs.create(Path::new("/tmp"), InodeType::Dir).unwrap().unlock();

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let fs = &fs;
            s.spawn(move || {
                for k in (worker..FILES).step_by(WORKERS) {
                    let path = PathBuf::from(format!("/tmp/f{k}"));
                    fs.create(&path, InodeType::File).unwrap().unlock();
                }
                for k in (worker..FILES).step_by(WORKERS) {
                    let path = PathBuf::from(format!("/tmp/f{k}"));
                    fs.remove(&path).unwrap();
                }
            });
        }
    });

    assert_eq!(tree(&fs), "/\n/tmp\n");
    assert_eq!(fs.live_inodes(), 2);
}

#[test]
fn test_racing_creates_of_the_same_path() {
    const WORKERS: usize = 8;

    let fs = Fs::new();
    let successes = AtomicUsize::new(0);

    thread::scope(|s| {
        for _ in 0..WORKERS {
            let fs = &fs;
            let successes = &successes;
            s.spawn(move || {
                if let Ok(inode) = fs.create(Path::new("/race"), InodeType::File) {
                    successes.fetch_add(1, Ordering::Relaxed);
                    inode.unlock();
                }
            });
        }
    });

    assert_eq!(successes.load(Ordering::Relaxed), 1);
    assert_eq!(fs.live_inodes(), 2);
    check_no_leaks(&fs);
}

#[test]
fn test_inverse_moves_do_not_deadlock() {
    const ROUNDS: usize = 300;

    let fs = Fs::new();
    fs.create(Path::new("/a"), InodeType::Dir).unwrap().unlock();
    fs.create(Path::new("/b"), InodeType::Dir).unwrap().unlock();
    fs.create(Path::new("/a/x"), InodeType::File).unwrap().unlock();

    thread::scope(|s| {
        for (source, dest) in [("/a/x", "/b/x"), ("/b/x", "/a/x")] {
            let fs = &fs;
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    // Losing the race to the inverse move is fine; deadlock
                    // or a vanished inode is not.
                    if let Ok(inode) = fs.mv(Path::new(source), Path::new(dest), Access::Unique) {
                        inode.unlock();
                    }
                }
            });
        }
    });

    let in_a = fs.find(Path::new("/a/x"), Access::Shared).map(|i| i.unlock()).is_ok();
    let in_b = fs.find(Path::new("/b/x"), Access::Shared).map(|i| i.unlock()).is_ok();
    assert!(in_a ^ in_b, "the file must live in exactly one directory");
    assert_eq!(fs.live_inodes(), 4);
    check_no_leaks(&fs);
}

#[test]
fn test_renames_race_with_readers() {
    const ROUNDS: usize = 300;

    let fs = Fs::new();
    fs.create(Path::new("/dir"), InodeType::Dir).unwrap().unlock();
    fs.create(Path::new("/dir/one"), InodeType::File).unwrap().unlock();

    thread::scope(|s| {
        let fs = &fs;
        s.spawn(move || {
            for round in 0..ROUNDS {
                let (source, dest) = if round % 2 == 0 {
                    ("/dir/one", "/dir/two")
                } else {
                    ("/dir/two", "/dir/one")
                };
                fs.mv(Path::new(source), Path::new(dest), Access::Unique)
                    .unwrap()
                    .unlock();
            }
        });
        for _ in 0..3 {
            s.spawn(move || {
                for _ in 0..ROUNDS {
                    // A lookup may lose the race to the renamer, but a hit
                    // must never observe a half-renamed entry.
                    for name in ["/dir/one", "/dir/two"] {
                        if let Ok(inode) = fs.find(Path::new(name), Access::Shared) {
                            assert_eq!(inode.ty(), InodeType::File);
                            inode.unlock();
                        }
                    }
                }
            });
        }
    });

    assert_eq!(fs.live_inodes(), 3);
    check_no_leaks(&fs);
}

#[test]
fn test_mixed_workload_quiesces_to_a_tree() {
    const WORKERS: usize = 8;
    const ROUNDS: usize = 200;

    let fs = Fs::new();
    for dir in ["/d0", "/d1", "/d2", "/d3"] {
        fs.create(Path::new(dir), InodeType::Dir).unwrap().unlock();
    }

    thread::scope(|s| {
        for worker in 0..WORKERS {
            let fs = &fs;
            s.spawn(move || {
                let home = format!("/d{}", worker % 4);
                for round in 0..ROUNDS {
                    let path = PathBuf::from(format!("{home}/w{worker}-{round}"));
                    fs.create(&path, InodeType::File).unwrap().unlock();
                    if let Ok(inode) = fs.find(&path, Access::Shared) {
                        inode.unlock();
                    }
                    // Shuffle every other file into the next directory over.
                    if round % 2 == 0 {
                        let dest =
                            PathBuf::from(format!("/d{}/w{worker}-{round}", (worker + 1) % 4));
                        fs.mv(&path, &dest, Access::Unique).unwrap().unlock();
                        fs.remove(&dest).unwrap();
                    } else {
                        fs.remove(&path).unwrap();
                    }
                }
            });
        }
    });

    assert_eq!(tree(&fs), "/\n/d0\n/d1\n/d2\n/d3\n");
    assert_eq!(fs.live_inodes(), 5);
}

#[test]
fn test_print_races_with_mutation() {
    const ROUNDS: usize = 100;

    let fs = Fs::new();
    fs.create(Path::new("/stable"), InodeType::Dir).unwrap().unlock();
    fs.create(Path::new("/stable/keep"), InodeType::File).unwrap().unlock();
    fs.create(Path::new("/churn"), InodeType::Dir).unwrap().unlock();

    thread::scope(|s| {
        let fs = &fs;
        s.spawn(move || {
            for round in 0..ROUNDS {
                let path = PathBuf::from(format!("/churn/f{round}"));
                fs.create(&path, InodeType::File).unwrap().unlock();
                fs.remove(&path).unwrap();
            }
        });
        s.spawn(move || {
            for _ in 0..ROUNDS {
                let output = tree(fs);
                // Whatever interleaving happened, the stable subtree is
                // complete in every snapshot.
                assert!(output.contains("/stable\n"));
                assert!(output.contains("/stable/keep\n"));
            }
        });
    });

    assert_eq!(fs.live_inodes(), 4);
    check_no_leaks(&fs);
}
