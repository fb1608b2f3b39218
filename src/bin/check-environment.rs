//! Tool to check that the external programs used by wireguard-dynamic-remote are available

use std::process::exit;

use wireguard_dynamic_remote::common::process::find_executable;
use wireguard_dynamic_remote::config::{load_config, Overrides};
use wireguard_dynamic_remote::wireguard::list_config_files;

/// One required program and what it is needed for
struct Requirement {
    names: &'static [&'static str],
    purpose: &'static str,
}

fn requirements() -> Vec<Requirement> {
    let mut list = vec![
        Requirement {
            names: &["wg"],
            purpose: "reading and updating interfaces",
        },
        Requirement {
            names: &["ping"],
            purpose: "liveness probes",
        },
    ];

    if cfg!(windows) {
        list.push(Requirement {
            names: &["pwsh", "powershell"],
            purpose: "name resolution and service control",
        });
    } else {
        list.push(Requirement {
            names: &["dig"],
            purpose: "name resolution",
        });
        list.push(Requirement {
            names: &["systemctl"],
            purpose: "service control",
        });
    }

    list
}

fn main() {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    println!("=== WireGuard Dynamic Remote Environment Check ===\n");

    let mut has_errors = false;

    println!("External programs:");
    for requirement in requirements() {
        let found = requirement.names.iter().find_map(|name| find_executable(name));
        match found {
            Some(path) => println!("  [OK     ] {:<10} {}", requirement.names[0], path.display()),
            None => {
                has_errors = true;
                println!(
                    "  [MISSING] {:<10} needed for {}",
                    requirement.names.join(" or "),
                    requirement.purpose
                );
            }
        }
    }

    println!("\nSettings:");
    match load_config(None, &Overrides::default()) {
        Ok(settings) => {
            let dir = &settings.config_dir;
            match list_config_files(dir) {
                Ok(names) if names.is_empty() => {
                    println!("  [WARNING] No *.conf files in {}", dir.display());
                }
                Ok(names) => {
                    println!("  [OK     ] {} contains: {}", dir.display(), names.join(", "));
                }
                Err(e) => {
                    has_errors = true;
                    println!("  [ERROR  ] Cannot read {}: {}", dir.display(), e);
                }
            }
        }
        Err(e) => {
            has_errors = true;
            println!("  [ERROR  ] {}", e);
        }
    }

    if has_errors {
        println!("\nCritical issues were found. Please resolve them before running wireguard-dynamic-remote.");
        exit(1);
    }

    println!("\nNo issues found. Environment is ready.");
}
