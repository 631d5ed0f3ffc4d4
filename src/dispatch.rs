//! Dispatcher (spec §4.6): a `(program, version, procedure)` → handler
//! table populated once at startup.

use std::collections::HashMap;

use crate::proc::ProcedureObj;

pub struct Dispatcher {
    table: HashMap<(u32, u32, u32), Box<dyn ProcedureObj>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let mut table: HashMap<(u32, u32, u32), Box<dyn ProcedureObj>> = HashMap::new();
        let nfs = crate::rpc::PROGRAM_NFS;
        let v3 = crate::rpc::VERSION_NFS3;
        table.insert((nfs, v3, 0), Box::new(crate::proc::null::Null));
        table.insert((nfs, v3, 1), Box::new(crate::proc::getattr::GetAttr));
        table.insert((nfs, v3, 2), Box::new(crate::proc::setattr::SetAttrProc));
        table.insert((nfs, v3, 3), Box::new(crate::proc::lookup::Lookup));
        table.insert((nfs, v3, 4), Box::new(crate::proc::access::Access));
        table.insert((nfs, v3, 5), Box::new(crate::proc::readlink::ReadLink));
        table.insert((nfs, v3, 6), Box::new(crate::proc::read::Read));
        table.insert((nfs, v3, 7), Box::new(crate::proc::write::Write));
        table.insert((nfs, v3, 8), Box::new(crate::proc::create::Create));
        table.insert((nfs, v3, 9), Box::new(crate::proc::mkdir::Mkdir));
        table.insert((nfs, v3, 10), Box::new(crate::proc::symlink::Symlink));
        table.insert((nfs, v3, 11), Box::new(crate::proc::mknod::Mknod));
        table.insert((nfs, v3, 12), Box::new(crate::proc::remove::Remove));
        table.insert((nfs, v3, 13), Box::new(crate::proc::rmdir::Rmdir));
        table.insert((nfs, v3, 14), Box::new(crate::proc::rename::Rename));
        table.insert((nfs, v3, 15), Box::new(crate::proc::link::Link));
        table.insert((nfs, v3, 16), Box::new(crate::proc::readdir::Readdir));
        table.insert((nfs, v3, 17), Box::new(crate::proc::readdirplus::ReaddirPlus));
        table.insert((nfs, v3, 18), Box::new(crate::proc::fsstat::FsStatProc));
        table.insert((nfs, v3, 19), Box::new(crate::proc::fsinfo::FsInfoProc));
        table.insert((nfs, v3, 20), Box::new(crate::proc::pathconf::PathConfProc));
        table.insert((nfs, v3, 21), Box::new(crate::proc::commit::Commit));
        Dispatcher { table }
    }

    /// Looks up an NFS procedure (MOUNT calls are routed separately by the
    /// transport; see [`crate::mount`]). Returns `Err` describing which
    /// RPC-level rejection applies when the program/version/procedure isn't
    /// known (spec §4.6: never surfaced as an NFS status).
    pub fn lookup(
        &self,
        program: u32,
        version: u32,
        procedure: u32,
    ) -> Result<&dyn ProcedureObj, crate::rpc::CallRejection> {
        if program != crate::rpc::PROGRAM_NFS {
            return Err(crate::rpc::CallRejection::ProgramUnavailable);
        }
        if version != crate::rpc::VERSION_NFS3 {
            return Err(crate::rpc::CallRejection::ProgramMismatch);
        }
        self.table
            .get(&(program, version, procedure))
            .map(|b| b.as_ref())
            .ok_or(crate::rpc::CallRejection::ProcedureUnavailable)
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_getattr() {
        let dispatcher = Dispatcher::new();
        let found = dispatcher.lookup(crate::rpc::PROGRAM_NFS, 3, 1);
        assert!(found.is_ok());
        assert_eq!(found.unwrap().name(), "GETATTR");
    }

    #[test]
    fn unknown_procedure_is_unavailable() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.lookup(crate::rpc::PROGRAM_NFS, 3, 999);
        assert!(matches!(result, Err(crate::rpc::CallRejection::ProcedureUnavailable)));
    }

    #[test]
    fn unknown_program_is_unavailable() {
        let dispatcher = Dispatcher::new();
        let result = dispatcher.lookup(999, 3, 0);
        assert!(matches!(result, Err(crate::rpc::CallRejection::ProgramUnavailable)));
    }
}
