//! Escrow contract: collateral and payment accounts per owner and id.

use std::sync::Arc;

use dataswap_core::client::{ChainClient, TxOptions, TxReceipt};
use dataswap_core::error::{ConfigError, ContractError};
use dataswap_core::message::CorrelationRule;
use dataswap_core::result;
use dataswap_core::types::{ContractKind, EscrowType, Fund};
use dataswap_core::value::ParamValue;

use super::{decoded, impl_protocol_contract, Binding, ContractSpec};

pub const ABI: &[&str] = &[
    "function getOwnerFund(uint8 escrowType, address owner, uint64 id) view returns (uint256 available, uint256 collateral, uint256 lock)",
    "function getBeneficiariesList(uint8 escrowType, address owner, uint64 id) view returns (address[])",
    "function getBeneficiaryFund(uint8 escrowType, address owner, uint64 id, address beneficiary) view returns (uint256 available, uint256 collateral, uint256 lock)",
    "function collateral(uint8 escrowType, address owner, uint64 id, uint256 amount) payable",
    "function collateralRedeem(uint8 escrowType, address owner, uint64 id)",
    "function withdraw(uint8 escrowType, address owner, uint64 id)",
    "function payment(uint8 escrowType, address owner, uint64 id, uint256 amount) payable",
    "function paymentSingleBeneficiary(uint8 escrowType, address owner, uint64 id, address beneficiary, uint256 amount) payable",
    "function paymentWithdraw(uint8 escrowType, address owner, uint64 id, address beneficiary)",
    "function paymentTransfer(uint8 escrowType, address owner, uint64 id, uint256 amount)",
    "function paymentRefund(uint8 escrowType, address owner, uint64 id)",
];

pub(crate) const SPEC: ContractSpec = ContractSpec {
    kind: ContractKind::Escrow,
    calls: &["getOwnerFund", "getBeneficiariesList", "getBeneficiaryFund"],
    sends: &[
        "collateral",
        "collateralRedeem",
        "withdraw",
        "payment",
        "paymentSingleBeneficiary",
        "paymentWithdraw",
        "paymentTransfer",
        "paymentRefund",
    ],
    // escrow traffic is keyed by (type, owner, id), never by dataset/matching
    rules: &[
        ("collateral", CorrelationRule::NONE),
        ("collateralRedeem", CorrelationRule::NONE),
        ("withdraw", CorrelationRule::NONE),
        ("payment", CorrelationRule::NONE),
        ("paymentSingleBeneficiary", CorrelationRule::NONE),
        ("paymentWithdraw", CorrelationRule::NONE),
        ("paymentTransfer", CorrelationRule::NONE),
        ("paymentRefund", CorrelationRule::NONE),
    ],
};

/// Leading `(type, owner, id)` arguments shared by every escrow method.
fn account(escrow_type: EscrowType, owner: &str, id: u64) -> Vec<ParamValue> {
    vec![
        ParamValue::Uint(escrow_type.as_u8().into()),
        ParamValue::Address(owner.to_string()),
        ParamValue::from(id),
    ]
}

#[derive(Clone)]
pub struct EscrowContract {
    binding: Binding,
}

impl EscrowContract {
    pub fn new(address: &str, client: Arc<dyn ChainClient>) -> Result<Self, ConfigError> {
        Ok(Self {
            binding: Binding::new(&SPEC, address, client)?,
        })
    }

    pub async fn get_owner_fund(&self, escrow_type: EscrowType, owner: &str, id: u64) -> Result<Fund, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call("getOwnerFund", account(escrow_type, owner, id))
            .await?;
        decoded(SPEC.kind, "getOwnerFund", result::decode_fund(&raw))
    }

    pub async fn get_beneficiaries_list(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
    ) -> Result<Vec<String>, ContractError> {
        let raw = self
            .binding
            .dispatcher
            .call("getBeneficiariesList", account(escrow_type, owner, id))
            .await?;
        decoded(SPEC.kind, "getBeneficiariesList", result::as_text_list("beneficiaries", &raw))
    }

    pub async fn get_beneficiary_fund(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        beneficiary: &str,
    ) -> Result<Fund, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Address(beneficiary.to_string()));
        let raw = self.binding.dispatcher.call("getBeneficiaryFund", args).await?;
        decoded(SPEC.kind, "getBeneficiaryFund", result::decode_fund(&raw))
    }

    // ─── Sends ────────────────────────────────────────────────────────────────

    /// Deposit `amount` as collateral. The native value travels in `options`.
    pub async fn collateral(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        amount: u128,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Uint(amount));
        self.binding.dispatcher.send("collateral", args, options).await
    }

    pub async fn collateral_redeem(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        self.binding
            .dispatcher
            .send("collateralRedeem", account(escrow_type, owner, id), options)
            .await
    }

    pub async fn withdraw(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        self.binding
            .dispatcher
            .send("withdraw", account(escrow_type, owner, id), options)
            .await
    }

    pub async fn payment(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        amount: u128,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Uint(amount));
        self.binding.dispatcher.send("payment", args, options).await
    }

    pub async fn payment_single_beneficiary(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        beneficiary: &str,
        amount: u128,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Address(beneficiary.to_string()));
        args.push(ParamValue::Uint(amount));
        self.binding
            .dispatcher
            .send("paymentSingleBeneficiary", args, options)
            .await
    }

    pub async fn payment_withdraw(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        beneficiary: &str,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Address(beneficiary.to_string()));
        self.binding.dispatcher.send("paymentWithdraw", args, options).await
    }

    pub async fn payment_transfer(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        amount: u128,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        let mut args = account(escrow_type, owner, id);
        args.push(ParamValue::Uint(amount));
        self.binding.dispatcher.send("paymentTransfer", args, options).await
    }

    pub async fn payment_refund(
        &self,
        escrow_type: EscrowType,
        owner: &str,
        id: u64,
        options: &TxOptions,
    ) -> Result<TxReceipt, ContractError> {
        self.binding
            .dispatcher
            .send("paymentRefund", account(escrow_type, owner, id), options)
            .await
    }
}

impl_protocol_contract!(EscrowContract);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::testing::{tuple, MockClient};
    use crate::contracts::ProtocolContract;
    use dataswap_core::message::RawMessage;

    const ESCROW: &str = "0x1111111111111111111111111111111111111111";
    const OWNER: &str = "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045";

    #[tokio::test]
    async fn owner_fund_is_rebuilt_from_tuple() {
        let client = MockClient::new();
        client.reply(
            "getOwnerFund",
            tuple(vec![
                ("available", ParamValue::Uint(100)),
                ("collateral", ParamValue::Uint(40)),
                ("lock", ParamValue::BigUint("7".into())),
            ]),
        );
        let escrow = EscrowContract::new(ESCROW, client.clone()).unwrap();

        let fund = escrow
            .get_owner_fund(EscrowType::DatacapCollateral, OWNER, 7)
            .await
            .unwrap();
        assert_eq!(fund, Fund { available: 100, collateral: 40, lock: 7 });

        let call = client.last();
        assert_eq!(call.address, ESCROW);
        assert_eq!(
            call.args,
            vec![ParamValue::Uint(1), ParamValue::Address(OWNER.into()), ParamValue::Uint(7)]
        );
    }

    #[tokio::test]
    async fn short_fund_tuple_is_a_decode_error() {
        let client = MockClient::new();
        client.reply("getBeneficiaryFund", tuple(vec![("available", ParamValue::Uint(1))]));
        let escrow = EscrowContract::new(ESCROW, client).unwrap();

        let err = escrow
            .get_beneficiary_fund(EscrowType::TotalDataCap, OWNER, 1, OWNER)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::Decode { .. }), "{err}");
    }

    #[tokio::test]
    async fn payment_single_beneficiary_argument_order() {
        let client = MockClient::new();
        let escrow = EscrowContract::new(ESCROW, client.clone()).unwrap();
        let opts = TxOptions::from_address(OWNER).value(500);

        escrow
            .payment_single_beneficiary(EscrowType::DatacapCollateral, OWNER, 7, ESCROW, 500, &opts)
            .await
            .unwrap();

        let sent = client.last();
        assert!(sent.send);
        assert_eq!(sent.method, "paymentSingleBeneficiary");
        assert_eq!(sent.args[3], ParamValue::Address(ESCROW.into()));
        assert_eq!(sent.args[4], ParamValue::Uint(500));
    }

    #[tokio::test]
    async fn bad_sender_never_reaches_chain() {
        let client = MockClient::new();
        let escrow = EscrowContract::new(ESCROW, client.clone()).unwrap();

        let err = escrow
            .withdraw(EscrowType::DatacapCollateral, OWNER, 7, &TxOptions::from_address("0xA"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::InvalidTxOptions(_)));
        assert!(client.seen().is_empty());
    }

    #[test]
    fn collateral_message_has_no_correlation() {
        let escrow = EscrowContract::new(ESCROW, MockClient::new()).unwrap();
        let msg = RawMessage::with_params(
            "collateral",
            [
                ("type", ParamValue::Uint(1)),
                ("owner", ParamValue::Address("0xA".into())),
                ("id", ParamValue::Uint(7)),
                ("amount", ParamValue::Uint(1000)),
            ],
        );

        let event = escrow.decode_message(&msg).unwrap();
        assert_eq!(event.method, "collateral");
        assert_eq!(event.contract, ContractKind::Escrow);
        assert!(event.correlation.is_empty());
        assert_eq!(event.param("amount"), Some(&ParamValue::Uint(1000)));
    }

    #[test]
    fn reads_are_not_decodable_messages() {
        let escrow = EscrowContract::new(ESCROW, MockClient::new()).unwrap();
        let msg = RawMessage::with_params("getOwnerFund", [("id", 7u64)]);
        assert!(escrow.decode_message(&msg).is_err());
    }
}
