//! Application call transactions.

use crate::crypto::Address;
use crate::encoding::msgpack::CanonicalMap;

/// What happens to the application after the call.
///
/// Variants carry only the data the action needs.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum OnCompletion {
    NoOp,
    OptIn,
    CloseOut,
    /// Clears local state unconditionally.
    Clear,
    Update {
        approval_program: Vec<u8>,
        clear_program: Vec<u8>,
    },
    Delete,
    Create(AppCreate),
}

impl OnCompletion {
    /// The numeric action stored in the transaction.
    ///
    /// Creation is a no-op call with application ID zero.
    pub fn wire_value(&self) -> u64 {
        match self {
            OnCompletion::NoOp | OnCompletion::Create(_) => 0,
            OnCompletion::OptIn => 1,
            OnCompletion::CloseOut => 2,
            OnCompletion::Clear => 3,
            OnCompletion::Update { .. } => 4,
            OnCompletion::Delete => 5,
        }
    }
}

/// Everything needed to create an application.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct AppCreate {
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u32,
}

/// Storage limits of an application.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

crate::test_macros::impl_arbitrary!(StateSchema, num_uints, num_byte_slices);

impl StateSchema {
    fn to_canonical_map(self) -> CanonicalMap {
        let mut map = CanonicalMap::new();
        map.uint("nbs", self.num_byte_slices).uint("nui", self.num_uints);
        map
    }
}

#[derive(Debug, Clone, Default, Eq, PartialEq)]
#[non_exhaustive]
pub struct AppCallOptionalFields {
    pub args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
}

impl AppCallOptionalFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn args(mut self, args: Vec<Vec<u8>>) -> Self {
        self.args = args;
        self
    }

    pub fn accounts(mut self, accounts: Vec<Address>) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn foreign_apps(mut self, foreign_apps: Vec<u64>) -> Self {
        self.foreign_apps = foreign_apps;
        self
    }

    pub fn foreign_assets(mut self, foreign_assets: Vec<u64>) -> Self {
        self.foreign_assets = foreign_assets;
        self
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ApplicationCall {
    app_id: u64,
    pub on_completion: OnCompletion,
    pub args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
}

impl ApplicationCall {
    pub fn new(app_id: u64, on_completion: OnCompletion, optional: AppCallOptionalFields) -> Self {
        let app_id = match on_completion {
            OnCompletion::Create(_) => 0,
            _ => app_id,
        };
        ApplicationCall {
            app_id,
            on_completion,
            args: optional.args,
            accounts: optional.accounts,
            foreign_apps: optional.foreign_apps,
            foreign_assets: optional.foreign_assets,
        }
    }

    /// Zero for creation.
    pub fn app_id(&self) -> u64 {
        self.app_id
    }

    pub(super) fn encode_into(&self, map: &mut CanonicalMap) {
        map.bin_array("apaa", self.args.iter().map(Vec::as_slice))
            .uint("apan", self.on_completion.wire_value())
            .bin_array("apat", self.accounts.iter().map(|account| &account.as_bytes()[..]))
            .uint_array("apas", &self.foreign_assets)
            .uint_array("apfa", &self.foreign_apps)
            .uint("apid", self.app_id);

        match &self.on_completion {
            OnCompletion::Update { approval_program, clear_program } => {
                map.bin("apap", approval_program).bin("apsu", clear_program);
            },
            OnCompletion::Create(create) => {
                map.bin("apap", &create.approval_program)
                    .bin("apsu", &create.clear_program)
                    .map("apgs", create.global_schema.to_canonical_map())
                    .map("apls", create.local_schema.to_canonical_map())
                    .uint("apep", create.extra_pages.into());
            },
            OnCompletion::NoOp | OnCompletion::OptIn | OnCompletion::CloseOut | OnCompletion::Clear | OnCompletion::Delete => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::msgpack;
    use crate::transaction::tests::{account, params};
    use crate::transaction::{Transaction, TransactionKind};

    fn top_level_keys(tx: &Transaction) -> Vec<String> {
        let bytes = tx.to_bytes();
        let mut cursor = &*bytes;
        let len = msgpack::read_map_len(&mut cursor).unwrap();
        (0..len).map(|_| {
            let key = msgpack::read_str(&mut cursor).unwrap().to_owned();
            msgpack::skip_value(&mut cursor).unwrap();
            key
        }).collect()
    }

    #[test]
    fn wire_values() {
        let actions = [
            OnCompletion::NoOp,
            OnCompletion::OptIn,
            OnCompletion::CloseOut,
            OnCompletion::Clear,
            OnCompletion::Update { approval_program: vec![1], clear_program: vec![1] },
            OnCompletion::Delete,
            OnCompletion::Create(AppCreate::default()),
        ];
        let values = actions.iter().map(OnCompletion::wire_value).collect::<Vec<_>>();
        assert_eq!(values, [0, 1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn opt_in_encoding() {
        let tx = Transaction::app_opt_in(account(1).address(), 42, &params());
        assert_eq!(top_level_keys(&tx), ["apan", "apid", "fee", "fv", "gen", "gh", "lv", "snd", "type"]);
    }

    #[test]
    fn noop_has_no_action_field() {
        let optional = AppCallOptionalFields::new()
            .args(vec![b"add".to_vec(), crate::args::number(5).to_vec()])
            .foreign_apps(vec![7])
            .foreign_assets(vec![8, 9])
            .accounts(vec![account(2).address()]);
        let tx = Transaction::app_call_with_optional(account(1).address(), 42, &params(), OnCompletion::NoOp, optional);
        assert_eq!(top_level_keys(&tx), ["apaa", "apas", "apat", "apfa", "apid", "fee", "fv", "gen", "gh", "lv", "snd", "type"]);
    }

    #[test]
    fn create_ignores_app_id() {
        let create = AppCreate {
            approval_program: vec![0x06, 0x81, 0x01],
            clear_program: vec![0x06, 0x81, 0x01],
            global_schema: StateSchema { num_uints: 1, num_byte_slices: 0 },
            local_schema: StateSchema::default(),
            extra_pages: 0,
        };
        let tx = Transaction::app_call(account(1).address(), 42, &params(), OnCompletion::Create(create));
        match &tx.kind {
            TransactionKind::ApplicationCall(call) => assert_eq!(call.app_id(), 0),
            _ => panic!("expected application call"),
        }
        assert_eq!(top_level_keys(&tx), ["apap", "apgs", "apsu", "fee", "fv", "gen", "gh", "lv", "snd", "type"]);
    }

    #[test]
    fn update_carries_programs() {
        let update = OnCompletion::Update { approval_program: vec![0x06], clear_program: vec![0x06] };
        let tx = Transaction::app_call(account(1).address(), 42, &params(), update);
        assert_eq!(top_level_keys(&tx), ["apan", "apap", "apid", "apsu", "fee", "fv", "gen", "gh", "lv", "snd", "type"]);
    }
}
