use crate::error::SignerError;
use crate::signer::WagerSigner;
use crate::types::Pubkey;
use solana_program::hash::Hash;
use solana_program::instruction::Instruction;
use solana_program::message::Message;

/// Legacy message paying fees from `payer`, ready to sign.
pub fn compile_message(instructions: &[Instruction], payer: &Pubkey, blockhash: &Hash) -> Message {
    Message::new_with_blockhash(instructions, Some(payer), blockhash)
}

/// Sign a message whose only required signer is `signer` and produce the
/// wire transaction: signature count, signature, message bytes.
pub fn sign_transaction(message: &Message, signer: &dyn WagerSigner) -> Result<Vec<u8>, SignerError> {
    let required = message.header.num_required_signatures as usize;
    if required != 1 {
        return Err(SignerError::CannotSign(format!(
            "transaction needs {} signatures, only one signer is available",
            required
        )));
    }
    if message.account_keys.first() != Some(&signer.pubkey()) {
        return Err(SignerError::CannotSign(format!(
            "fee payer {} is not the signing wallet {}",
            message.account_keys.first().copied().unwrap_or_default(),
            signer.pubkey()
        )));
    }

    let data = message.serialize();
    let signature = signer.sign(&data)?;

    // compact-u16 count, a single byte below 128
    let mut out = Vec::with_capacity(1 + signature.len() + data.len());
    out.push(1);
    out.extend_from_slice(&signature);
    out.extend_from_slice(&data);
    Ok(out)
}
