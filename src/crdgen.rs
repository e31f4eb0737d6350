//! # CRD Generator
//!
//! Generates Kubernetes CustomResourceDefinition YAML from the Rust type
//! definitions, one document per kind.
//!
//! ## Usage
//!
//! ```bash
//! # Generate CRD YAML
//! cargo run --bin crdgen > config/crd/terminal-resources.yaml
//!
//! # Generate and apply directly
//! cargo run --bin crdgen | kubectl apply -f -
//! ```
//!
//! The generated CRDs include OpenAPI schema validation, required fields,
//! defaults, printer columns, and the status subresource.

use kube::core::CustomResourceExt;

use terminal_operator::crd::{Address, App, Card, Cart, Order, Profile, Subscription, Token};

fn main() {
    let crds = [
        Profile::crd(),
        Address::crd(),
        Card::crd(),
        Token::crd(),
        App::crd(),
        Cart::crd(),
        Subscription::crd(),
        Order::crd(),
    ];

    for crd in crds {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("Failed to serialize CRD to YAML: {e}");
                std::process::exit(1);
            }
        }
    }
}
