// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (JWT auth, role checked per handler)
pub mod protected;
pub mod public;

#[cfg(test)]
mod tests {
    /// Every handler file opens with its `// handlers/<tier>/<file>.rs - purpose` line
    #[test]
    fn handler_files_name_themselves() {
        let sources = [
            ("handlers/protected/activities.rs", include_str!("protected/activities.rs")),
            ("handlers/protected/files.rs", include_str!("protected/files.rs")),
            ("handlers/protected/notifications.rs", include_str!("protected/notifications.rs")),
            ("handlers/protected/portals.rs", include_str!("protected/portals.rs")),
            ("handlers/protected/session.rs", include_str!("protected/session.rs")),
            ("handlers/protected/updates.rs", include_str!("protected/updates.rs")),
            ("handlers/protected/usage.rs", include_str!("protected/usage.rs")),
            ("handlers/public/auth.rs", include_str!("public/auth.rs")),
            ("handlers/public/plans.rs", include_str!("public/plans.rs")),
        ];

        for (path, source) in sources {
            let first = source.lines().next().unwrap_or_default();
            assert!(first.starts_with(&format!("// {} - ", path)), "{} starts with {:?}", path, first);
        }
    }
}
