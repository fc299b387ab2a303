use log::info;

use crate::{
    ServiceError, ServiceResult,
    app::{ArcParticipantRepository, ArcSingleRepository},
    participants::{Participant, ParticipantFilter, ParticipantId},
    persistence::{participants::ParticipantRepository, singles::SingleRepository},
};

pub type PersonId = i64;
pub type SingleId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: PersonId,
    pub name: String,
}

/// An individual-person competitor, as opposed to a team.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Single {
    pub id: SingleId,
    pub person_id: PersonId,
}

/// A single with its person resolved, the deepest level of eager loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleWithPerson {
    pub single: Single,
    pub person: Person,
}

#[derive(Debug, Clone, Default)]
pub struct SingleFilter {
    pub person_id: Option<PersonId>,
    pub include_person: bool,
    pub include_participants: bool,
}

#[derive(Debug, Clone)]
pub struct SingleDetail {
    pub single: Single,
    pub person: Option<Person>,
    pub participants: Option<Vec<Participant>>,
}

#[async_trait::async_trait]
pub trait SingleService {
    async fn create_single(&self, person_id: PersonId) -> ServiceResult<SingleDetail>;
    async fn get_singles(&self, filter: SingleFilter) -> ServiceResult<Vec<SingleDetail>>;
    async fn get_single(&self, id: SingleId) -> ServiceResult<SingleDetail>;
    async fn update_single(&self, id: SingleId, person_id: PersonId) -> ServiceResult<SingleDetail>;
    /// Points an existing single-typed participant at this single.
    async fn link_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<SingleDetail>;
    /// Removes the participant row linked to this single. A participant
    /// cannot exist without a competitor, so unlinking deletes it together
    /// with its events.
    async fn unlink_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<SingleDetail>;
    async fn delete_single(&self, id: SingleId) -> ServiceResult<()>;
}

pub struct SingleServiceImpl {
    single_repository: ArcSingleRepository,
    participant_repository: ArcParticipantRepository,
}

impl SingleServiceImpl {
    pub fn new(
        single_repository: ArcSingleRepository,
        participant_repository: ArcParticipantRepository,
    ) -> Self {
        Self {
            single_repository,
            participant_repository,
        }
    }

    async fn load_participants(&self, id: SingleId) -> ServiceResult<Vec<Participant>> {
        self.participant_repository
            .get_participants(&ParticipantFilter {
                single_id: Some(id),
                ..Default::default()
            })
            .await
    }

    async fn full_detail(&self, id: SingleId) -> ServiceResult<SingleDetail> {
        let Some(with_person) = self.single_repository.get_single_with_person(id).await? else {
            return ServiceError::not_found("Single not found");
        };
        let participants = self.load_participants(id).await?;
        Ok(SingleDetail {
            single: with_person.single,
            person: Some(with_person.person),
            participants: Some(participants),
        })
    }
}

#[async_trait::async_trait]
impl SingleService for SingleServiceImpl {
    async fn create_single(&self, person_id: PersonId) -> ServiceResult<SingleDetail> {
        let single = self.single_repository.create_single(person_id).await?;
        info!("Created single {} for person {}", single.id, person_id);
        self.full_detail(single.id).await
    }

    async fn get_singles(&self, filter: SingleFilter) -> ServiceResult<Vec<SingleDetail>> {
        let singles = self.single_repository.get_singles(&filter).await?;
        let mut details = Vec::with_capacity(singles.len());
        for single in singles {
            let person = if filter.include_person {
                self.single_repository
                    .get_single_with_person(single.id)
                    .await?
                    .map(|w| w.person)
            } else {
                None
            };
            let participants = if filter.include_participants {
                Some(self.load_participants(single.id).await?)
            } else {
                None
            };
            details.push(SingleDetail {
                single,
                person,
                participants,
            });
        }
        Ok(details)
    }

    async fn get_single(&self, id: SingleId) -> ServiceResult<SingleDetail> {
        self.full_detail(id).await
    }

    async fn update_single(
        &self,
        id: SingleId,
        person_id: PersonId,
    ) -> ServiceResult<SingleDetail> {
        self.single_repository.update_single(id, person_id).await?;
        info!("Updated single {} to person {}", id, person_id);
        self.full_detail(id).await
    }

    async fn link_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<SingleDetail> {
        self.single_repository
            .link_participant(id, participant_id)
            .await?;
        info!("Linked participant {} to single {}", participant_id, id);
        self.full_detail(id).await
    }

    async fn unlink_participant(
        &self,
        id: SingleId,
        participant_id: ParticipantId,
    ) -> ServiceResult<SingleDetail> {
        self.single_repository
            .unlink_participant(id, participant_id)
            .await?;
        info!("Unlinked participant {} from single {}", participant_id, id);
        self.full_detail(id).await
    }

    async fn delete_single(&self, id: SingleId) -> ServiceResult<()> {
        self.single_repository.delete_single(id).await?;
        info!("Deleted single {} with its participants", id);
        Ok(())
    }
}
