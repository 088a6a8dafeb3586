//! Known-good vectors for the 2-of-2 spend used across the unit tests

pub const PRIVATE_KEY_1: &str = "39dc0a9f0b185a2ee56349691f34716e6e0cda06a7f9707742ac113c4e2317bf";
pub const PRIVATE_KEY_2: &str = "5077ccd9c558b7d04a81920d38aa11b4a9f9de3b23fab45c3ef28039920fdd6d";

// Public keys in redeem script order. `PRIVATE_KEY_2` controls the first one.
pub const PUBLIC_KEY_A: &str = "032ff8c5df0bc00fe1ac2319c3b8070d6d1e04cfbf4fedda499ae7b775185ad53b";
pub const PUBLIC_KEY_B: &str = "039bbc8d24f89e5bc44c5b0d1980d6658316a6b2440023117c3c03a4975b04dd56";

pub const REDEEM_SCRIPT: &str = "5221032ff8c5df0bc00fe1ac2319c3b8070d6d1e04cfbf4fedda499ae7b775185ad53b21039bbc8d24f89e5bc44c5b0d1980d6658316a6b2440023117c3c03a4975b04dd5652ae";
pub const WITNESS_PROGRAM: &str =
    "00204d4b11da1a44efeb2882827c0b85fbc82d30a60fccab14d032226f5428b57cb6";
pub const SCRIPT_HASH: &str = "043f512301b66ffa8d73e71907e2b0b809895215";
pub const MAINNET_ADDRESS: &str = "325UUecEQuyrTd28Xs2hvAxdAjHM7XzqVF";
pub const REGTEST_ADDRESS: &str = "2MsdgYPYG2NVCfQegCzeaY7wtP5VWqeAEsT";

pub const AMOUNT: u64 = 100_000;

pub const HASH_PREVOUTS: &str = "ca5ace6dec772a290777987fd77016fcfd32925a42c84389b7b5fbd1c02654e1";
pub const HASH_SEQUENCE: &str = "3bb13029ce7b1f559ef5e747fcac439f1455a2ec7c5f09b72290795e70665044";
pub const HASH_OUTPUTS: &str = "a3826eabfef600911c29ae1945bb9e53bb887f4905526e79207f2483f588be0b";
pub const SIGHASH: &str = "49275f3027c347196d9cd74ebe10d95ced1594eb3d235dcb031e565aca9258d6";

// RFC6979 signatures over `SIGHASH`, with the SIGHASH_ALL byte
pub const SIGNATURE_1: &str = "3045022100ea67ac7b2a5baa463dc18c5f26c604b25ea763e3111d5a1bd156e6d0be32ae750220656c9270e6f68a84c30ba8da4b6d4eb83b21804b1ed451e4a7574eed82c62b9e01";
pub const SIGNATURE_2: &str = "3044022008582707b503b6a66e452e056c1ec549f6cfcefe10daeb021e4b3c3ee4e93bf6022073b939ef71b4d249dbf2a190ed8daa08ef49548f8b7b073c34f5dd9c4062488a01";

pub const UNSIGNED_TX: &str = "0200000001000000000000000000000000000000000000000000000000000000000000000000000000232200204d4b11da1a44efeb2882827c0b85fbc82d30a60fccab14d032226f5428b57cb6ffffffff01a08601000000000017a914043f512301b66ffa8d73e71907e2b0b8098952158700000000";
pub const SIGNED_TX: &str = "02000000000101000000000000000000000000000000000000000000000000000000000000000000000000232200204d4b11da1a44efeb2882827c0b85fbc82d30a60fccab14d032226f5428b57cb6ffffffff01a08601000000000017a914043f512301b66ffa8d73e71907e2b0b809895215870400473044022008582707b503b6a66e452e056c1ec549f6cfcefe10daeb021e4b3c3ee4e93bf6022073b939ef71b4d249dbf2a190ed8daa08ef49548f8b7b073c34f5dd9c4062488a01483045022100ea67ac7b2a5baa463dc18c5f26c604b25ea763e3111d5a1bd156e6d0be32ae750220656c9270e6f68a84c30ba8da4b6d4eb83b21804b1ed451e4a7574eed82c62b9e01475221032ff8c5df0bc00fe1ac2319c3b8070d6d1e04cfbf4fedda499ae7b775185ad53b21039bbc8d24f89e5bc44c5b0d1980d6658316a6b2440023117c3c03a4975b04dd5652ae00000000";
