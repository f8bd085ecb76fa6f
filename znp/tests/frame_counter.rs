use znp::{
	FirmwareVersion, TcFrameCounter, Znp, ZnpConfig, Error,
	nvids::{ ExNvId, OsalNvId },
	transport::MemoryRadio,
	types::Eui64
};

fn epid() -> Eui64 {
	Eui64::from_hex("abdefabcdefabcde").unwrap()
}

fn other_epid() -> Eui64 {
	Eui64::from_hex("1122334455667788").unwrap()
}

fn entry(counter: u32, epid: &Eui64) -> Vec<u8> {
	let mut e = counter.to_le_bytes().to_vec();
	e.extend_from_slice(&epid.0);
	e
}

async fn connect(radio: MemoryRadio) -> Znp<MemoryRadio> {
	let firmware = radio.firmware();

	Znp::connect(radio, ZnpConfig { firmware: Some(firmware), ..ZnpConfig::default() }).await.unwrap()
}

#[async_std::test]
async fn zstack12_counter_is_in_nwkkey() {
	let mut radio = MemoryRadio::new(FirmwareVersion::ZStack12);
	let mut nwkkey = vec![0x01];
	nwkkey.extend_from_slice(&[0xAB; 16]);
	nwkkey.extend_from_slice(&[0x78, 0x56, 0x34, 0x12]);
	radio.legacy.insert(OsalNvId::NWKKEY.0, nwkkey);

	let mut znp = connect(radio).await;
	let counter = TcFrameCounter::for_firmware(znp.firmware());

	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 0x12345678);
	//idempotent
	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 0x12345678);

	counter.write(&mut znp, epid(), 0xAABBCCDD).await.unwrap();
	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 0xAABBCCDD);

	let stored = &znp.transport().legacy[&OsalNvId::NWKKEY.0];
	assert_eq!(&stored[..17], &[&[0x01][..], &[0xAB; 16][..]].concat()[..]);
	assert_eq!(&stored[17..], &[0xDD, 0xCC, 0xBB, 0xAA]);
}

#[async_std::test]
async fn zstack30_prefers_exact_entry_then_wildcard() {
	let start = OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_START.0;
	let mut radio = MemoryRadio::new(FirmwareVersion::ZStack30);

	//ignored on this firmware
	radio.legacy.insert(OsalNvId::NWKKEY.0, vec![0x01; 21]);
	radio.legacy.insert(start, hex::decode("0f000000058eea0f004b1200").unwrap());
	radio.legacy.insert(start + 1, entry(1, &epid()));
	radio.legacy.insert(start + 2, entry(2, &Eui64::BROADCAST));

	let mut znp = connect(radio).await;
	let counter = TcFrameCounter::for_firmware(znp.firmware());

	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 1);
	assert_eq!(counter.read(&mut znp, other_epid()).await.unwrap(), 2);

	counter.write(&mut znp, other_epid(), 0xAABBCCDD).await.unwrap();
	assert_eq!(counter.read(&mut znp, other_epid()).await.unwrap(), 0xAABBCCDD);
	assert_eq!(znp.transport().legacy[&(start + 2)], entry(0xAABBCCDD, &Eui64::BROADCAST));

	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 1);
	counter.write(&mut znp, epid(), 0xABCDABCD).await.unwrap();
	assert_eq!(znp.transport().legacy[&(start + 1)], entry(0xABCDABCD, &epid()));
	assert_eq!(znp.transport().legacy[&(start + 2)], entry(0xAABBCCDD, &Eui64::BROADCAST));
}

#[async_std::test]
async fn zstack30_creates_wildcard_entry() {
	let start = OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_START.0;
	let mut radio = MemoryRadio::new(FirmwareVersion::ZStack30);
	radio.legacy.insert(start, entry(7, &other_epid()));

	let mut znp = connect(radio).await;
	let counter = TcFrameCounter::for_firmware(znp.firmware());

	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 0);
	assert_eq!(znp.transport().legacy[&(start + 1)], entry(0, &Eui64::BROADCAST));

	counter.write(&mut znp, epid(), 69281).await.unwrap();
	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 69281);
	assert_eq!(znp.transport().legacy[&start], entry(7, &other_epid()));
}

#[async_std::test]
async fn zstack30_reuses_unused_slot_of_full_table() {
	let start = OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_START.0;
	let end = OsalNvId::LEGACY_NWK_SEC_MATERIAL_TABLE_END.0;
	let mut radio = MemoryRadio::new(FirmwareVersion::ZStack30);

	for id in start..=end {
		radio.legacy.insert(id, entry(9, &other_epid()));
	}

	radio.legacy.insert(start + 4, entry(0, &Eui64::ZERO));

	let mut znp = connect(radio).await;
	let counter = TcFrameCounter::for_firmware(znp.firmware());

	counter.write(&mut znp, epid(), 5).await.unwrap();
	assert_eq!(znp.transport().legacy[&(start + 4)], entry(5, &Eui64::BROADCAST));

	//no unused slot left
	znp.transport_mut().legacy.insert(start + 4, entry(9, &other_epid()));
	assert!(matches!(counter.read(&mut znp, epid()).await, Err(Error::TableFull(_))));
}

#[async_std::test]
async fn zstack3x0_requires_exact_entry() {
	let mut radio = MemoryRadio::new(FirmwareVersion::ZStack3x0);
	let table = ExNvId::NWK_SEC_MATERIAL_TABLE.0;

	radio.legacy.insert(OsalNvId::NWKKEY.0, hex::decode("00c927e9ce1544c9aa42340e4d5dc4c257e4010001000000").unwrap());
	radio.extended.insert((1, table, 0), hex::decode("0100000037a7479777d7a224").unwrap());
	radio.extended.insert((1, table, 1), entry(2, &epid()));
	radio.extended.insert((1, table, 2), entry(3, &Eui64::BROADCAST));

	let mut znp = connect(radio).await;
	let counter = TcFrameCounter::for_firmware(znp.firmware());

	assert_eq!(counter.read(&mut znp, epid()).await.unwrap(), 2);

	match counter.read(&mut znp, other_epid()).await {
		Err(Error::NoMatchingSecurityEntry { extended_pan_id }) => assert_eq!(extended_pan_id, other_epid()),
		r => panic!("unexpected {:?}", r)
	}

	assert!(matches!(counter.write(&mut znp, other_epid(), 1).await, Err(Error::NoMatchingSecurityEntry { .. })));

	counter.write(&mut znp, epid(), 0xABCDABCD).await.unwrap();
	assert_eq!(znp.transport().extended[&(1, table, 1)], entry(0xABCDABCD, &epid()));
	assert_eq!(znp.transport().extended.len(), 3);
}
