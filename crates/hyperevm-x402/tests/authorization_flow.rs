use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use x402::eip712::{recover_signer, DomainFields};
use x402::provider::ProviderMarkers;
use x402::{
    BuilderConfig, FlowState, InjectedEnvironment, LocalWallet, PaymentAuthorizationBuilder,
    RpcError, WalletProvider, X402Error, HYPEREVM_CHAIN_ID, USDT0_ADDRESS,
};

/// Wraps a [`LocalWallet`], recording every request and misbehaving on demand.
#[derive(Default)]
struct Script {
    reject_connect: bool,
    reject_sign: bool,
    break_chain_id: bool,
    fail_first_sign: AtomicBool,
    reject_first_sign: AtomicBool,
    reported_account: Option<String>,
    /// Signs in place of the connected account.
    impostor: Option<LocalWallet>,
}

struct ScriptedWallet {
    inner: LocalWallet,
    script: Script,
    calls: Mutex<Vec<(String, serde_json::Value)>>,
}

impl ScriptedWallet {
    fn new(chain_id: u64, script: Script) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalWallet::new(PrivateKeySigner::random(), chain_id),
            script,
            calls: Mutex::new(Vec::new()),
        })
    }

    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_calls(&self) -> Vec<serde_json::Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, _)| m == "eth_signTypedData_v4")
            .map(|(_, p)| serde_json::from_str(p[1].as_str().unwrap()).unwrap())
            .collect()
    }
}

impl WalletProvider for ScriptedWallet {
    async fn request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params.clone()));

        match method {
            "eth_requestAccounts" if self.script.reject_connect => Err(RpcError::user_rejected()),
            "eth_requestAccounts" | "eth_accounts" if self.script.reported_account.is_some() => {
                self.inner.request(method, params).await?;
                Ok(serde_json::json!([self.script.reported_account]))
            }
            "eth_chainId" if self.script.break_chain_id => Err(RpcError::unsupported(method)),
            "eth_signTypedData_v4" if self.script.reject_sign => Err(RpcError::user_rejected()),
            "eth_signTypedData_v4" if self.script.fail_first_sign.swap(false, Ordering::SeqCst) => {
                Err(RpcError::new(RpcError::INTERNAL, "Internal JSON-RPC error."))
            }
            "eth_signTypedData_v4" if self.script.reject_first_sign.swap(false, Ordering::SeqCst) => {
                Err(RpcError::user_rejected())
            }
            "eth_signTypedData_v4" if self.script.impostor.is_some() => {
                let impostor = self.script.impostor.as_ref().unwrap();
                let mut params = params;
                params[0] = serde_json::json!(impostor.address().to_string());
                impostor.request(method, params).await
            }
            _ => self.inner.request(method, params).await,
        }
    }

    fn markers(&self) -> ProviderMarkers {
        ProviderMarkers::default().with_flag("isRabby")
    }

    fn subscribe_accounts(&self) -> tokio::sync::broadcast::Receiver<Vec<String>> {
        self.inner.subscribe_accounts()
    }
}

fn builder(wallet: &Arc<ScriptedWallet>) -> PaymentAuthorizationBuilder<ScriptedWallet> {
    let config = BuilderConfig {
        wallet_timeout: Duration::from_secs(5),
        rpc_timeout: Duration::from_secs(2),
        ..BuilderConfig::default()
    };
    PaymentAuthorizationBuilder::new(InjectedEnvironment::from_shared(wallet.clone()), config)
}

fn domain() -> DomainFields {
    DomainFields {
        name: "USD₮0".to_string(),
        version: "1".to_string(),
        chain_id: HYPEREVM_CHAIN_ID,
        verifying_contract: USDT0_ADDRESS,
    }
}

#[tokio::test]
async fn no_wallet_is_not_detected_and_cannot_connect() {
    let mut builder = PaymentAuthorizationBuilder::new(
        InjectedEnvironment::<LocalWallet>::empty(),
        BuilderConfig::default(),
    );
    assert!(!builder.detect_wallet());
    assert!(matches!(builder.connect().await, Err(X402Error::NoProvider)));
    assert_eq!(builder.state(), FlowState::Idle);
}

#[tokio::test]
async fn connect_records_active_signer() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);

    assert!(builder.detect_wallet());
    let address = builder.connect().await.unwrap();
    assert_eq!(address, wallet.address());
    assert_eq!(builder.active_signer(), Some(wallet.address()));
    assert_eq!(builder.state(), FlowState::Connected);
    assert!(!builder.busy().connecting);
}

#[tokio::test]
async fn rejected_connect_is_reported_as_rejection() {
    let wallet = ScriptedWallet::new(
        HYPEREVM_CHAIN_ID,
        Script {
            reject_connect: true,
            ..Script::default()
        },
    );
    let mut builder = builder(&wallet);

    let err = builder.connect().await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(builder.state(), FlowState::Rejected);
    assert_eq!(builder.active_signer(), None);
}

#[tokio::test]
async fn restore_connection_does_not_prompt() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);

    assert_eq!(builder.restore_connection().await.unwrap(), None);
    wallet
        .request("eth_requestAccounts", serde_json::json!([]))
        .await
        .unwrap();
    assert_eq!(
        builder.restore_connection().await.unwrap(),
        Some(wallet.address())
    );
}

#[tokio::test]
async fn primary_path_signs_valid_signature() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let signature = builder.sign(&auth, &domain()).await.unwrap();

    assert_eq!(signature.len(), 132);
    assert_eq!(recover_signer(&auth, &domain(), &signature).unwrap(), wallet.address());
    assert_eq!(builder.state(), FlowState::Signed);

    let calls = wallet.sign_calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0]["types"].get("EIP712Domain").is_some());
}

#[tokio::test]
async fn fallback_adds_domain_type_and_still_signs() {
    let wallet = ScriptedWallet::new(
        HYPEREVM_CHAIN_ID,
        Script {
            break_chain_id: true,
            ..Script::default()
        },
    );
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let signature = builder.sign(&auth, &domain()).await.unwrap();

    assert_eq!(recover_signer(&auth, &domain(), &signature).unwrap(), wallet.address());
    let calls = wallet.sign_calls();
    assert_eq!(calls.len(), 1, "only the raw RPC path reached the wallet");
    assert_eq!(calls[0]["types"]["EIP712Domain"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn both_paths_sign_identical_messages() {
    let wallet = ScriptedWallet::new(
        HYPEREVM_CHAIN_ID,
        Script {
            fail_first_sign: AtomicBool::new(true),
            ..Script::default()
        },
    );
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "2.5").unwrap();
    let signature = builder.sign(&auth, &domain()).await.unwrap();
    assert_eq!(recover_signer(&auth, &domain(), &signature).unwrap(), wallet.address());

    let calls = wallet.sign_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0]["message"], calls[1]["message"]);
    assert_eq!(calls[0]["domain"], calls[1]["domain"]);
    assert_eq!(calls[1]["message"]["value"], "2500000");
}

#[tokio::test]
async fn address_differing_only_in_case_is_accepted() {
    let signer = PrivateKeySigner::random();
    let lower = signer.address().to_string().to_lowercase();
    let wallet = Arc::new(ScriptedWallet {
        inner: LocalWallet::new(signer, HYPEREVM_CHAIN_ID),
        script: Script {
            reported_account: Some(lower),
            ..Script::default()
        },
        calls: Mutex::new(Vec::new()),
    });
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    assert!(builder.sign(&auth, &domain()).await.is_ok());
}

#[tokio::test]
async fn address_mismatch_aborts_before_signature_request() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let mut auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    auth.from = Address::repeat_byte(0x33);

    let err = builder.sign(&auth, &domain()).await.unwrap_err();
    assert!(matches!(err, X402Error::AddressMismatch { .. }));
    assert!(wallet.sign_calls().is_empty());
    assert_eq!(builder.state(), FlowState::Error);
}

#[tokio::test]
async fn wrong_network_is_chain_mismatch() {
    let wallet = ScriptedWallet::new(1, Script::default());
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let err = builder.sign(&auth, &domain()).await.unwrap_err();
    assert!(matches!(err, X402Error::ChainMismatch { expected: 999, .. }));
    assert!(err.user_message().contains("999"));
}

#[tokio::test]
async fn rejected_signature_is_retried_once_via_raw_rpc() {
    let wallet = ScriptedWallet::new(
        HYPEREVM_CHAIN_ID,
        Script {
            reject_sign: true,
            ..Script::default()
        },
    );
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let err = builder.sign(&auth, &domain()).await.unwrap_err();
    assert!(err.is_rejection());
    assert_eq!(wallet.sign_calls().len(), 2);
    assert_eq!(builder.state(), FlowState::Rejected);

    // The caller may start over.
    assert!(builder.state().can_transition(FlowState::Signing));
}

#[tokio::test]
async fn rejection_on_structured_path_falls_back_to_raw_rpc() {
    let wallet = ScriptedWallet::new(
        HYPEREVM_CHAIN_ID,
        Script {
            reject_first_sign: AtomicBool::new(true),
            ..Script::default()
        },
    );
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let signature = builder.sign(&auth, &domain()).await.unwrap();

    assert_eq!(recover_signer(&auth, &domain(), &signature).unwrap(), wallet.address());
    assert_eq!(wallet.sign_calls().len(), 2);
    assert_eq!(builder.state(), FlowState::Signed);
}

#[tokio::test]
async fn signature_from_another_key_is_refused() {
    let wallet = Arc::new(ScriptedWallet {
        inner: LocalWallet::new(PrivateKeySigner::random(), HYPEREVM_CHAIN_ID),
        script: Script {
            impostor: Some(
                LocalWallet::new(PrivateKeySigner::random(), HYPEREVM_CHAIN_ID).pre_authorized(),
            ),
            ..Script::default()
        },
        calls: Mutex::new(Vec::new()),
    });
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let auth = builder.build_authorization(Address::repeat_byte(0x22), "0.1").unwrap();
    let err = builder.sign(&auth, &domain()).await.unwrap_err();

    assert!(matches!(err, X402Error::AddressMismatch { .. }));
    assert_eq!(wallet.sign_calls().len(), 2, "both strategies reached the wallet");
    assert_eq!(builder.state(), FlowState::Error);
}

#[tokio::test]
async fn account_changes_follow_the_wallet() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);
    let mut events = builder.subscribe_accounts().unwrap();

    builder.connect().await.unwrap();
    let connected = events.recv().await.unwrap();
    builder.apply_accounts_changed(&connected);
    assert_eq!(builder.active_signer(), Some(wallet.address()));

    wallet.inner.revoke();
    let revoked = events.recv().await.unwrap();
    builder.apply_accounts_changed(&revoked);
    assert_eq!(builder.active_signer(), None);
    assert_eq!(builder.state(), FlowState::Idle);
}

#[tokio::test]
async fn authorize_produces_payment_object() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let mut builder = builder(&wallet);
    builder.connect().await.unwrap();

    let rpc = x402::domain::connect_rpc("http://127.0.0.1:1").unwrap();
    let payment = builder
        .authorize(&rpc, Address::repeat_byte(0x22), "0.1")
        .await
        .unwrap();

    assert_eq!(payment.authorization.value, "100000");
    assert!(payment.signature.starts_with("0x"));
    assert_eq!(payment.signature.len(), 132);
    assert!(payment.signature[2..].chars().all(|c| c.is_ascii_hexdigit()));
    assert!(payment
        .authorization
        .from
        .eq_ignore_ascii_case(&wallet.address().to_string()));

    let valid_after: u64 = payment.authorization.valid_after.parse().unwrap();
    let valid_before: u64 = payment.authorization.valid_before.parse().unwrap();
    assert_eq!(valid_before - valid_after, 3600);
}

#[tokio::test]
async fn strict_domain_policy_refuses_fallback() {
    let wallet = ScriptedWallet::new(HYPEREVM_CHAIN_ID, Script::default());
    let config = BuilderConfig {
        rpc_timeout: Duration::from_secs(2),
        domain_policy: x402::domain::DomainPolicy::RequireOnChain,
        ..BuilderConfig::default()
    };
    let mut builder =
        PaymentAuthorizationBuilder::new(InjectedEnvironment::from_shared(wallet.clone()), config);
    builder.connect().await.unwrap();

    let rpc = x402::domain::connect_rpc("http://127.0.0.1:1").unwrap();
    let err = builder
        .authorize(&rpc, Address::repeat_byte(0x22), "0.1")
        .await
        .unwrap_err();
    assert!(matches!(err, X402Error::NetworkError(_)));
    assert!(wallet.sign_calls().is_empty());
}
