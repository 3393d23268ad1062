/// Logs the calling process's identity. Run it before and after patching a
/// credential block to see whether the write landed.
pub fn whoami() {
    use nix::unistd::*;
    // getres{u,g}id() should never fail (as long as the caller passes
    // valid pointers to these functions)
    log::info!("UID = {:?}", getresuid().unwrap());
    log::info!("GID = {:?}", getresgid().unwrap());
    log::info!("Groups = {:?}", getgroups());
}

pub fn is_root() -> bool {
    nix::unistd::Uid::effective().is_root()
}

#[cfg(test)]
mod tests {
    #[test]
    fn is_root_matches_geteuid() {
        assert_eq!(super::is_root(), nix::unistd::geteuid().is_root());
    }
}
